use condition_waiter::{
    wait_for_appearance, wait_for_stable_attribute, DocumentPort, Locator, NodeHandle, WaitOpts,
};
use fanout_core_types::{RunStep, StepOutcome};
use tokio::time::sleep;
use tracing::{info, instrument, warn};

use crate::errors::DriveError;
use crate::model::{DriveCtx, DriveTempo, PageScript};
use crate::ports::PagePort;

pub struct RuntimeDeps<'a> {
    pub doc: &'a dyn DocumentPort,
    pub page: &'a dyn PagePort,
    pub script: &'a PageScript,
    pub tempo: &'a DriveTempo,
}

/// Drive the fixed interaction script once and report a single outcome.
///
/// Every internal failure is caught here and converted into a failed
/// `StepOutcome`; nothing propagates as an unhandled fault, and exactly one
/// outcome is produced regardless of which step failed.
#[instrument(skip_all, fields(job = %ctx.job, profile = %ctx.profile))]
pub async fn run(ctx: &DriveCtx, step: RunStep, deps: RuntimeDeps<'_>) -> StepOutcome {
    match execute(ctx, &step, &deps).await {
        Ok(result) => {
            info!(target: "driver", bytes = result.len(), "script completed");
            StepOutcome::success(step.job, step.profile, result)
        }
        Err(err) => {
            warn!(target: "driver", error = %err, "script failed");
            StepOutcome::failure(step.job, step.profile, err.to_string())
        }
    }
}

/// Strictly ordered; no step starts before the previous one resolves.
async fn execute(
    ctx: &DriveCtx,
    step: &RunStep,
    deps: &RuntimeDeps<'_>,
) -> Result<String, DriveError> {
    if ctx.cancel.is_cancelled() {
        return Err(DriveError::Cancelled);
    }
    let script = deps.script;
    let tempo = deps.tempo;
    let opts = WaitOpts::bounded(tempo.wait_timeout);

    // 1. Input field.
    let input = wait_for_appearance(deps.doc, &script.input, &opts)
        .await
        .map_err(DriveError::InputNotFound)?;

    // 2. Write the payload; synthetic notifications are part of set_value.
    deps.page.set_value(input, &step.payload).await?;

    // 3. Submit control, then let the page's post-render wiring attach.
    let submit = wait_for_appearance(deps.doc, &script.submit, &opts)
        .await
        .map_err(DriveError::ControlNotFound)?;
    sleep(tempo.pre_select_settle).await;

    // 4. Profile selection sub-script.
    select_profile(step, deps, &opts).await?;

    // 5. Settle again, then submit (form-preferred inside the port).
    sleep(tempo.pre_submit_settle).await;
    deps.page.submit(submit).await?;

    // 6. Result container, then its content source settling on a real value.
    wait_for_appearance(deps.doc, &script.result, &opts).await?;
    let result = wait_for_stable_attribute(
        deps.doc,
        &script.result,
        &script.result_attr,
        |value| script.result_value_is_valid(value),
        tempo.stabilization,
        &opts,
    )
    .await?;

    // 7. Serialize and hand the payload up.
    Ok(deps.page.outer_html(result).await?)
}

/// Open the chooser, match an option by visible text, activate it. One-shot
/// pokes; the only wait is for the chooser control itself.
async fn select_profile(
    step: &RunStep,
    deps: &RuntimeDeps<'_>,
    opts: &WaitOpts,
) -> Result<NodeHandle, DriveError> {
    let script = deps.script;
    let chooser = wait_for_appearance(deps.doc, &script.chooser, opts)
        .await
        .map_err(DriveError::ControlNotFound)?;
    deps.page.activate(chooser).await?;
    sleep(deps.tempo.chooser_settle).await;

    let wanted = Locator::role_text(script.option_role.clone(), step.profile.0.clone());
    let option = deps
        .doc
        .query(&wanted)
        .await
        .ok_or_else(|| DriveError::ProfileNotFound(step.profile.0.clone()))?;
    deps.page.activate(option).await?;
    Ok(option)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use condition_waiter::{MemoryDocument, MutationFilter, MutationRecord, NodeSpec};
    use fanout_core_types::{JobId, ProfileId, RunStep};
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::page::MemoryPage;

    fn quick_tempo() -> DriveTempo {
        DriveTempo {
            pre_select_settle: Duration::from_millis(10),
            chooser_settle: Duration::from_millis(5),
            pre_submit_settle: Duration::from_millis(5),
            stabilization: Duration::from_millis(30),
            wait_timeout: Duration::from_millis(300),
        }
    }

    fn ctx(job: u64, profile: &str) -> DriveCtx {
        DriveCtx::new(
            JobId(job),
            ProfileId::new(profile),
            CancellationToken::new(),
        )
    }

    fn step(job: u64, profile: &str, payload: &str) -> RunStep {
        RunStep {
            job: JobId(job),
            profile: ProfileId::new(profile),
            payload: payload.to_string(),
        }
    }

    /// Lay out the fixed page chrome: a form holding the input and submit
    /// button, a chooser trigger, and a menu of profile options.
    async fn build_page(doc: &MemoryDocument, profiles: &[&str]) {
        let form = doc.insert_root(NodeSpec::new("form")).await;
        doc.insert_child(form, NodeSpec::new("textarea").with_attr("id", "chatinput"))
            .await;
        doc.insert_child(
            form,
            NodeSpec::new("button").with_attr("id", "chatinput-send-message-button"),
        )
        .await;
        doc.insert_root(NodeSpec::new("button").with_attr("id", "profile-chooser"))
            .await;
        let menu = doc.insert_root(NodeSpec::new("div")).await;
        for profile in profiles {
            doc.insert_child(
                menu,
                NodeSpec::new("div")
                    .with_attr("role", "menuitemradio")
                    .with_text(*profile),
            )
            .await;
        }
    }

    /// Simulated page: on form submission, render the result panel with a
    /// placeholder source, then settle it on a real one.
    fn react_to_submission(doc: MemoryDocument, final_src: &str) -> tokio::task::JoinHandle<()> {
        let final_src = final_src.to_string();
        tokio::spawn(async move {
            let mut rx = doc.subscribe(MutationFilter::subtree()).await;
            while let Some(batch) = rx.recv().await {
                let submitted = batch.records.iter().any(
                    |record| matches!(record, MutationRecord::Attribute { name, .. } if name == "submit"),
                );
                if !submitted {
                    continue;
                }
                let panel = doc
                    .insert_root(
                        NodeSpec::new("iframe")
                            .with_attr("id", "live-preview-panel")
                            .with_attr("src", "about:blank"),
                    )
                    .await;
                tokio::time::sleep(Duration::from_millis(10)).await;
                doc.set_attribute(panel, "src", &final_src).await;
                return;
            }
        })
    }

    #[tokio::test]
    async fn full_script_produces_serialized_result() {
        let doc = MemoryDocument::new();
        build_page(&doc, &["Profile A", "Profile B"]).await;
        let page_task = react_to_submission(doc.clone(), "https://preview/a");

        let page = MemoryPage::new(doc.clone());
        let tempo = quick_tempo();
        let script = PageScript::default();
        let outcome = run(
            &ctx(1, "Profile A"),
            step(1, "Profile A", "hello"),
            RuntimeDeps {
                doc: &doc,
                page: &page,
                script: &script,
                tempo: &tempo,
            },
        )
        .await;

        assert!(outcome.ok, "unexpected failure: {:?}", outcome.message);
        let result = outcome.result.unwrap();
        assert!(result.contains("<iframe"));
        assert!(result.contains("https://preview/a"));

        // The payload write went through the page, synthetic events and all.
        let input = doc
            .query(&Locator::id("chatinput"))
            .await
            .expect("input still present");
        assert_eq!(doc.attribute(input, "value").await.as_deref(), Some("hello"));
        page_task.await.unwrap();
    }

    #[tokio::test]
    async fn missing_input_reports_input_not_found() {
        let doc = MemoryDocument::new();
        // No page at all; the first wait times out.
        let page = MemoryPage::new(doc.clone());
        let tempo = DriveTempo {
            wait_timeout: Duration::from_millis(30),
            ..quick_tempo()
        };
        let script = PageScript::default();
        let outcome = run(
            &ctx(2, "Profile A"),
            step(2, "Profile A", "hello"),
            RuntimeDeps {
                doc: &doc,
                page: &page,
                script: &script,
                tempo: &tempo,
            },
        )
        .await;
        assert!(!outcome.ok);
        assert!(outcome.result.is_none());
        assert!(outcome.message.unwrap().contains("InputNotFound"));
    }

    #[tokio::test]
    async fn unmatched_profile_reports_profile_not_found() {
        let doc = MemoryDocument::new();
        build_page(&doc, &["Profile A"]).await;
        let page = MemoryPage::new(doc.clone());
        let tempo = quick_tempo();
        let script = PageScript::default();
        let outcome = run(
            &ctx(3, "Profile Z"),
            step(3, "Profile Z", "hello"),
            RuntimeDeps {
                doc: &doc,
                page: &page,
                script: &script,
                tempo: &tempo,
            },
        )
        .await;
        assert!(!outcome.ok);
        assert!(outcome.message.unwrap().contains("ProfileNotFound"));
    }

    #[tokio::test]
    async fn result_never_appearing_reports_timeout() {
        let doc = MemoryDocument::new();
        build_page(&doc, &["Profile A"]).await;
        // Nobody reacts to the submission, so the result wait must bound out.
        let page = MemoryPage::new(doc.clone());
        let tempo = DriveTempo {
            wait_timeout: Duration::from_millis(50),
            ..quick_tempo()
        };
        let script = PageScript::default();
        let outcome = run(
            &ctx(4, "Profile A"),
            step(4, "Profile A", "hello"),
            RuntimeDeps {
                doc: &doc,
                page: &page,
                script: &script,
                tempo: &tempo,
            },
        )
        .await;
        assert!(!outcome.ok);
        assert!(outcome.message.unwrap().contains("timeout"));
    }

    #[tokio::test]
    async fn cancelled_context_short_circuits() {
        let doc = MemoryDocument::new();
        build_page(&doc, &["Profile A"]).await;
        let page = MemoryPage::new(doc.clone());
        let tempo = quick_tempo();
        let script = PageScript::default();
        let cancelled = CancellationToken::new();
        cancelled.cancel();
        let outcome = run(
            &DriveCtx::new(JobId(5), ProfileId::new("Profile A"), cancelled),
            step(5, "Profile A", "hello"),
            RuntimeDeps {
                doc: &doc,
                page: &page,
                script: &script,
                tempo: &tempo,
            },
        )
        .await;
        assert!(!outcome.ok);
        assert!(outcome.message.unwrap().contains("cancelled"));
    }
}
