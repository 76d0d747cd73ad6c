//! One-shot self-deactivation once the successor is installed.

use anyhow::{Context, Result};
use pdfintercept_core::events::Action;
use pdfintercept_core::model::TabId;
use pdfintercept_core::viewer_url::original_resource_url;
use pdfintercept_core::Interceptor;

/// An open tab showing this extension's viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerTab {
    pub tab_id: TabId,
    pub url: String,
}

/// Host operations the deactivation needs.
pub trait ExtensionHost {
    /// Tabs currently showing one of this extension's pages.
    fn viewer_tabs(&self) -> Vec<ViewerTab>;
    fn navigate_tab(&mut self, tab_id: TabId, url: &str) -> Result<()>;
    fn uninstall_self(&mut self) -> Result<()>;
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeactivationReport {
    /// Listener removals the host must mirror.
    pub unregistered: Vec<Action>,
    /// Tabs sent back to their original resource, with the URL used.
    pub migrated: Vec<(TabId, String)>,
}

/// Runs the deactivation at most once.
#[derive(Debug, Default)]
pub struct Deactivator {
    done: bool,
}

impl Deactivator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Stop interception, migrate viewer tabs, then uninstall.
    ///
    /// Returns `Ok(None)` if a previous call already ran. A tab that fails to
    /// navigate is logged and skipped; a failed uninstall is an error.
    pub fn deactivate<H: ExtensionHost>(
        &mut self,
        interceptor: &mut Interceptor,
        host: &mut H,
    ) -> Result<Option<DeactivationReport>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;

        let mut report = DeactivationReport {
            unregistered: interceptor.deactivate(),
            ..DeactivationReport::default()
        };

        let viewer = interceptor.config().viewer()?;
        for tab in host.viewer_tabs() {
            if !viewer.is_viewer_page(&tab.url) {
                continue;
            }
            let Some(original) = original_resource_url(&tab.url) else {
                continue;
            };
            match host.navigate_tab(tab.tab_id, &original) {
                Ok(()) => {
                    tracing::debug!(tab_id = tab.tab_id, url = %original, "viewer tab migrated");
                    report.migrated.push((tab.tab_id, original));
                }
                Err(e) => {
                    tracing::warn!(tab_id = tab.tab_id, "could not migrate viewer tab: {}", e)
                }
            }
        }

        host.uninstall_self().context("uninstall after migration")?;
        tracing::info!(migrated = report.migrated.len(), "extension deactivated");
        Ok(Some(report))
    }
}
