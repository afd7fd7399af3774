//! [`BenchPage`] on a live chromiumoxide page.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::cdp::browser_protocol::tracing::{
    EndParams, EventDataCollected, EventTracingComplete, StartParams,
};
use chromiumoxide::layout::Point;
use chromiumoxide::listeners::EventStream;
use chromiumoxide::Page;
use futures::StreamExt;
use tracing::debug;
use typebench::{CdpContext, CdpElement, ElementHandle, TypebenchError, TypebenchResult, Viewport};
use url::Url;

use crate::bench::BenchPage;

/// Categories recorded in `<target>.json`, as used by the DevTools
/// performance panel
pub const TRACE_CATEGORIES: &[&str] = &[
    "-*",
    "devtools.timeline",
    "v8.execute",
    "disabled-by-default-devtools.timeline",
    "disabled-by-default-devtools.timeline.frame",
    "toplevel",
    "blink.console",
    "blink.user_timing",
    "latencyInfo",
    "disabled-by-default-devtools.timeline.stack",
    "disabled-by-default-v8.cpu_profiler",
];

/// How long to wait for `Tracing.tracingComplete` after `Tracing.end`
const TRACE_COMPLETE_TIMEOUT: Duration = Duration::from_secs(30);

const CENTER_JS: &str = "function() {
    const rect = this.getBoundingClientRect();
    return { x: rect.left + rect.width / 2, y: rect.top + rect.height / 2 };
}";

struct TraceCapture {
    data: EventStream<EventDataCollected>,
    complete: EventStream<EventTracingComplete>,
}

/// A Chromium tab driven over CDP
pub struct CdpBenchPage {
    page: Page,
    trace: Option<TraceCapture>,
}

impl std::fmt::Debug for CdpBenchPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdpBenchPage")
            .field("page", &self.page)
            .field("tracing", &self.trace.is_some())
            .finish()
    }
}

impl CdpBenchPage {
    /// Wrap an open page
    #[must_use]
    pub const fn new(page: Page) -> Self {
        Self { page, trace: None }
    }

    async fn dispatch_key(
        &self,
        kind: DispatchKeyEventType,
        key: &str,
        text: Option<&str>,
        virtual_key: Option<i64>,
    ) -> TypebenchResult<()> {
        let mut builder = DispatchKeyEventParams::builder().r#type(kind).key(key);
        if let Some(text) = text {
            builder = builder.text(text);
        }
        if let Some(code) = virtual_key {
            builder = builder
                .code(key)
                .windows_virtual_key_code(code)
                .native_virtual_key_code(code);
        }
        let params = builder.build().map_err(input_error)?;
        self.page
            .execute(params)
            .await
            .map_err(|e| input_error(e.to_string()))?;
        Ok(())
    }

    async fn press_enter(&self) -> TypebenchResult<()> {
        self.dispatch_key(DispatchKeyEventType::KeyDown, "Enter", Some("\r"), Some(13))
            .await?;
        self.dispatch_key(DispatchKeyEventType::KeyUp, "Enter", None, Some(13))
            .await
    }

    async fn press_char(&self, ch: char) -> TypebenchResult<()> {
        let text = ch.to_string();
        self.dispatch_key(DispatchKeyEventType::KeyDown, &text, Some(&text), None)
            .await?;
        self.dispatch_key(DispatchKeyEventType::KeyUp, &text, None, None)
            .await
    }
}

#[async_trait]
impl BenchPage for CdpBenchPage {
    type Context = CdpContext;

    async fn set_viewport(&self, viewport: Viewport) -> TypebenchResult<()> {
        let params = SetDeviceMetricsOverrideParams::new(
            i64::from(viewport.width),
            i64::from(viewport.height),
            1.0,
            false,
        );
        self.page
            .execute(params)
            .await
            .map_err(|e| TypebenchError::PageError {
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn navigate(&self, url: &Url) -> TypebenchResult<()> {
        self.page
            .goto(url.as_str())
            .await
            .map_err(|e| TypebenchError::NavigationError {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn document(&self) -> TypebenchResult<CdpContext> {
        CdpContext::document(&self.page).await
    }

    async fn click(&self, element: &CdpElement) -> TypebenchResult<()> {
        let center = element.evaluate(CENTER_JS).await?;
        let coordinate = |axis: &str| {
            center[axis].as_f64().ok_or_else(|| {
                input_error(format!("no {axis} coordinate for {}", element.describe()))
            })
        };
        let point = Point {
            x: coordinate("x")?,
            y: coordinate("y")?,
        };
        debug!(x = point.x, y = point.y, "clicking");
        self.page
            .click(point)
            .await
            .map_err(|e| input_error(e.to_string()))?;
        Ok(())
    }

    async fn type_text(&self, text: &str) -> TypebenchResult<()> {
        for ch in text.chars() {
            self.press_char(ch).await?;
        }
        Ok(())
    }

    async fn press_key(&self, key: &str) -> TypebenchResult<()> {
        let mut chars = key.chars();
        match (key, chars.next(), chars.next()) {
            ("Enter", _, _) => self.press_enter().await,
            (_, Some(ch), None) => self.press_char(ch).await,
            _ => Err(input_error(format!("unsupported key {key}"))),
        }
    }

    async fn start_trace(&mut self) -> TypebenchResult<()> {
        let data = self
            .page
            .event_listener::<EventDataCollected>()
            .await
            .map_err(trace_error)?;
        let complete = self
            .page
            .event_listener::<EventTracingComplete>()
            .await
            .map_err(trace_error)?;
        let params = StartParams::builder()
            .categories(TRACE_CATEGORIES.join(","))
            .build();
        self.page.execute(params).await.map_err(trace_error)?;
        self.trace = Some(TraceCapture { data, complete });
        Ok(())
    }

    async fn stop_trace(&mut self) -> TypebenchResult<Vec<serde_json::Value>> {
        let mut capture = self.trace.take().ok_or_else(|| TypebenchError::TraceError {
            message: "tracing was not started".to_string(),
        })?;
        self.page
            .execute(EndParams::default())
            .await
            .map_err(trace_error)?;

        let collect = async {
            let mut events = Vec::new();
            loop {
                tokio::select! {
                    biased;
                    Some(chunk) = capture.data.next() => events.extend(chunk.value.iter().cloned()),
                    _ = capture.complete.next() => break,
                }
            }
            events
        };
        let events = tokio::time::timeout(TRACE_COMPLETE_TIMEOUT, collect)
            .await
            .map_err(|_| TypebenchError::TraceError {
                message: "tracing did not complete".to_string(),
            })?;
        debug!(events = events.len(), "trace collected");
        Ok(events)
    }

    async fn pdf(&self) -> TypebenchResult<Vec<u8>> {
        self.page
            .pdf(PrintToPdfParams::default())
            .await
            .map_err(|e| TypebenchError::PdfError {
                message: e.to_string(),
            })
    }

    async fn close(&mut self) -> TypebenchResult<()> {
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| TypebenchError::PageError {
                message: e.to_string(),
            })
    }
}

fn input_error(message: String) -> TypebenchError {
    TypebenchError::InputError { message }
}

fn trace_error(err: chromiumoxide::error::CdpError) -> TypebenchError {
    TypebenchError::TraceError {
        message: err.to_string(),
    }
}
