use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::debug;

use crate::errors::WaitError;
use crate::ports::{DocumentPort, Locator, MutationFilter, NodeHandle};

/// Per-wait options. Transient; lives only for one wait call.
#[derive(Clone, Debug)]
pub struct WaitOpts {
    /// `None` means the wait may suspend forever. Callers accepting that
    /// must also accept the node-lost-without-outcome failure mode.
    pub timeout: Option<Duration>,
}

impl Default for WaitOpts {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(10)),
        }
    }
}

impl WaitOpts {
    pub fn bounded(limit: Duration) -> Self {
        Self {
            timeout: Some(limit),
        }
    }

    pub fn unbounded() -> Self {
        Self { timeout: None }
    }
}

async fn bound<F>(fut: F, opts: &WaitOpts, what: &Locator) -> Result<NodeHandle, WaitError>
where
    F: Future<Output = Result<NodeHandle, WaitError>>,
{
    match opts.timeout {
        Some(limit) => match timeout(limit, fut).await {
            Ok(res) => res,
            Err(_) => Err(WaitError::Timeout(what.to_string())),
        },
        None => fut.await,
    }
}

/// Resolve once the located node exists. Resolves without suspension when it
/// already does. Otherwise suspends on document-wide mutation batches and
/// re-evaluates the locator after each one; polling would race the page's
/// own asynchronous rendering.
///
/// Dropping the returned future drops the mutation subscription with it, so
/// cancellation never leaks an observer past the wait's logical end.
pub async fn wait_for_appearance(
    doc: &dyn DocumentPort,
    locator: &Locator,
    opts: &WaitOpts,
) -> Result<NodeHandle, WaitError> {
    // Subscribe before the initial probe: a node inserted between probe and
    // subscription would otherwise be missed until an unrelated mutation.
    let mut rx = doc.subscribe(MutationFilter::subtree()).await;
    if let Some(node) = doc.query(locator).await {
        return Ok(node);
    }
    debug!(target: "waiter", %locator, "waiting for appearance");
    let appeared = async {
        loop {
            match rx.recv().await {
                Some(_batch) => {
                    if let Some(node) = doc.query(locator).await {
                        return Ok(node);
                    }
                }
                None => return Err(WaitError::Closed),
            }
        }
    };
    bound(appeared, opts, locator).await
}

/// Resolve once the node's attribute holds a valid value AND that value has
/// survived a full stabilization window unchanged. Pages often walk an
/// attribute through placeholder values before the final one settles, so the
/// first valid reading cannot be trusted.
///
/// A value change during the window re-enters validity checking against the
/// new value; only a vanished node rejects (`NodeLost`). Suspends on
/// attribute-filtered mutations of the node while the value is invalid.
pub async fn wait_for_stable_attribute<F>(
    doc: &dyn DocumentPort,
    locator: &Locator,
    attr: &str,
    is_valid: F,
    stabilization: Duration,
    opts: &WaitOpts,
) -> Result<NodeHandle, WaitError>
where
    F: Fn(&str) -> bool + Send + Sync,
{
    let stabilized = async {
        let mut node = match doc.query(locator).await {
            Some(node) => node,
            None => return Err(WaitError::NodeLost),
        };
        let mut rx = doc.subscribe(MutationFilter::attributes_of(node)).await;
        loop {
            // Phase one: suspend until the attribute reads as valid.
            let settled_from = loop {
                if !doc.is_attached(node).await {
                    return Err(WaitError::NodeLost);
                }
                match doc.attribute(node, attr).await {
                    Some(value) if is_valid(&value) => break value,
                    _ => match rx.recv().await {
                        Some(_batch) => continue,
                        None => return Err(WaitError::Closed),
                    },
                }
            };
            debug!(
                target: "waiter",
                %locator,
                attr,
                value = %settled_from,
                window_ms = stabilization.as_millis() as u64,
                "attribute valid, stabilizing"
            );

            // Phase two: the value must survive the window unchanged.
            sleep(stabilization).await;
            let current = match doc.query(locator).await {
                Some(found) => found,
                None => return Err(WaitError::NodeLost),
            };
            if current != node {
                // The node was replaced wholesale; observe the replacement
                // and start over.
                node = current;
                rx = doc.subscribe(MutationFilter::attributes_of(node)).await;
                continue;
            }
            match doc.attribute(node, attr).await {
                Some(value) if value == settled_from => return Ok(node),
                // Changed underneath us: re-validate against the new value.
                _ => continue,
            }
        }
    };
    bound(stabilized, opts, locator).await
}
