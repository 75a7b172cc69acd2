// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Headless browser validation driver (§4.10 `browser_validation`). No
//! pack example drives `chromiumoxide` directly, so this follows the
//! crate's own public API shape: launch once per stage, open one page
//! per scenario, and tear down when the stage finishes.

use std::path::Path;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::cdp::browser_protocol::runtime::{EventConsoleApiCalled, EventExceptionThrown};
use chromiumoxide::page::Page;
use futures_util::StreamExt;

use crate::run::{BrowserScenario, BrowserScenarioResult};

/// Candidate executables searched for when detecting a usable headless
/// browser (§4.10: "a browser driver to be detected (both installed and
/// a browser executable discoverable on disk)").
const CANDIDATE_EXECUTABLES: &[&str] = &["chromium", "chromium-browser", "google-chrome", "google-chrome-stable"];

/// Search `$PATH` and a couple of common install locations for a usable
/// Chromium/Chrome binary. Returns the first hit.
pub fn detect_browser_executable() -> Option<std::path::PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        for name in CANDIDATE_EXECUTABLES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    for fixed in ["/usr/bin/chromium", "/usr/bin/chromium-browser", "/usr/bin/google-chrome"] {
        let candidate = std::path::PathBuf::from(fixed);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// A launched browser for the duration of one `browser_validation`
/// stage attempt.
pub struct BrowserDriver {
    browser: Browser,
    _handler: tokio::task::JoinHandle<()>,
}

impl BrowserDriver {
    pub async fn launch(executable: &Path) -> anyhow::Result<Self> {
        let config = BrowserConfig::builder()
            .chrome_executable(executable)
            .no_sandbox()
            .build()
            .map_err(|e| anyhow::anyhow!("browser config: {e}"))?;
        let (browser, mut handler) = Browser::launch(config).await?;
        let handle = tokio::spawn(async move { while handler.next().await.is_some() {} });
        Ok(Self { browser, _handler: handle })
    }

    /// Run one scenario end to end and capture a full-page screenshot to
    /// `screenshot_path` on success (§4.10).
    pub async fn run_scenario(&self, scenario: &BrowserScenario, screenshot_path: &Path) -> BrowserScenarioResult {
        match self.run_scenario_inner(scenario, screenshot_path).await {
            Ok((console_errors, page_errors)) => BrowserScenarioResult {
                name: scenario.name.clone(),
                ok: true,
                console_errors,
                page_errors,
                screenshot_artifact_id: None,
                error: None,
            },
            Err(e) => BrowserScenarioResult {
                name: scenario.name.clone(),
                ok: false,
                console_errors: Vec::new(),
                page_errors: Vec::new(),
                screenshot_artifact_id: None,
                error: Some(e.to_string()),
            },
        }
    }

    async fn run_scenario_inner(
        &self,
        scenario: &BrowserScenario,
        screenshot_path: &Path,
    ) -> anyhow::Result<(Vec<String>, Vec<String>)> {
        let timeout = Duration::from_secs(scenario.clamped_timeout_secs());
        let page = self.browser.new_page("about:blank").await?;

        let mut console_events = page.event_listener::<EventConsoleApiCalled>().await?;
        let mut exception_events = page.event_listener::<EventExceptionThrown>().await?;

        tokio::time::timeout(timeout, navigate(&page, &scenario.url)).await.map_err(|_| anyhow::anyhow!("navigation timed out"))??;

        if let Some(selector) = &scenario.wait_selector {
            tokio::time::timeout(timeout, async {
                loop {
                    if page.find_element(selector).await.is_ok() {
                        return Ok::<(), anyhow::Error>(());
                    }
                    tokio::time::sleep(Duration::from_millis(150)).await;
                }
            })
            .await
            .map_err(|_| anyhow::anyhow!("timed out waiting for selector {selector}"))??;
        }

        if let Some(text) = &scenario.wait_text {
            let needle = text.clone();
            tokio::time::timeout(timeout, async {
                loop {
                    if let Ok(content) = page.content().await {
                        if content.contains(&needle) {
                            return Ok::<(), anyhow::Error>(());
                        }
                    }
                    tokio::time::sleep(Duration::from_millis(150)).await;
                }
            })
            .await
            .map_err(|_| anyhow::anyhow!("timed out waiting for text {text:?}"))??;
        }

        for fill in &scenario.fill {
            let element = page.find_element(&fill.selector).await?;
            element.click().await?;
            element.type_str(&fill.value).await?;
        }

        for (i, selector) in scenario.click.iter().enumerate() {
            let element = page.find_element(selector).await?;
            element.click().await?;
            if i + 1 < scenario.click.len() {
                tokio::time::sleep(Duration::from_millis(250)).await;
            }
        }

        if let Some(parent) = screenshot_path.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
        let png = page
            .screenshot(
                chromiumoxide::page::ScreenshotParams::builder().format(CaptureScreenshotFormat::Png).full_page(true).build(),
            )
            .await?;
        tokio::fs::write(screenshot_path, png).await?;

        let console_errors = drain_console_errors(&mut console_events);
        let page_errors = drain_page_errors(&mut exception_events);
        page.close().await.ok();
        Ok((console_errors, page_errors))
    }
}

async fn navigate(page: &Page, url: &str) -> anyhow::Result<()> {
    page.goto(url).await?;
    page.wait_for_navigation().await?;
    Ok(())
}

fn drain_console_errors(
    events: &mut (impl futures_util::Stream<Item = std::sync::Arc<EventConsoleApiCalled>> + Unpin),
) -> Vec<String> {
    let mut out = Vec::new();
    while let Some(Some(event)) = events.next().now_or_never() {
        let kind = format!("{:?}", event.r#type).to_ascii_lowercase();
        if kind.contains("error") {
            let text = event
                .args
                .iter()
                .filter_map(|a| a.value.as_ref())
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            out.push(text);
        }
    }
    out
}

fn drain_page_errors(
    events: &mut (impl futures_util::Stream<Item = std::sync::Arc<EventExceptionThrown>> + Unpin),
) -> Vec<String> {
    let mut out = Vec::new();
    while let Some(Some(event)) = events.next().now_or_never() {
        out.push(event.exception_details.text.clone());
    }
    out
}

use futures_util::FutureExt;

#[cfg(test)]
#[path = "browser_tests.rs"]
mod tests;
