//! Review CLI commands
//!
//! List, inspect, approve and reject predictions. Listing and rejection run
//! through [`ReviewView`]; approval stages a table selection and submits it
//! as a bulk action.

use anyhow::{Context, Result};
use tracing::warn;

use super::{backend, preferences};
use crate::adapters::{CodingApi, PredictionQuery};
use crate::config;
use crate::domain::{FeedbackSubmission, Prediction};
use crate::preferences::{JsonFileStore, Preferences};
use crate::ranking::format_probability;
use crate::review::{BulkAction, CaseTable, RowStatus, SortColumn, StatusFilter};
use crate::views::{DetailState, Driver, ReviewMsg, ReviewView, SubmitStatus};

/// Largest page the service hands out
const MAX_PAGE_SIZE: u32 = 100;

/// Corrections given on the command line for `reject`
#[derive(Debug, Clone)]
pub struct RejectArgs {
    pub main: String,
    pub main_name: Option<String>,
    pub secondary: Vec<(String, String)>,
    pub replace: Vec<(String, String)>,
    pub remove: Vec<String>,
    pub comment: String,
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

/// Validator from the flag, falling back to the stored name
fn resolve_validator(by: Option<String>, prefs: &Preferences<JsonFileStore>) -> Result<String> {
    by.or_else(|| prefs.validator_name().map(str::to_string))
        .filter(|name| !name.trim().is_empty())
        .context("No validator name. Pass --by or run `drgcoder validator <NAME>`")
}

/// Look up a code's name; empty if the service does not know it
async fn lookup_name(api: &dyn CodingApi, code: &str) -> String {
    match api.search_codes(code, 10).await {
        Ok(results) => results
            .into_iter()
            .find(|r| r.code.eq_ignore_ascii_case(code))
            .map(|r| r.name)
            .unwrap_or_default(),
        Err(e) => {
            warn!(code, error = %e, "Code lookup failed");
            String::new()
        }
    }
}

/// List predictions with filters and sorting
pub async fn list(
    search: Option<String>,
    status: StatusFilter,
    sort: Option<SortColumn>,
    desc: bool,
    page: u32,
    limit: Option<u32>,
) -> Result<()> {
    let cfg = config::config()?;
    let query = PredictionQuery {
        page: page.max(1),
        limit: limit.unwrap_or(cfg.review.page_size).clamp(1, MAX_PAGE_SIZE),
        validated: None,
    };

    let driver = Driver::new(backend()?);
    let mut view = ReviewView::new(preferences()?, query);

    driver.dispatch(&mut view, ReviewMsg::Refresh).await;
    if let Some(error) = view.load_error() {
        anyhow::bail!("Failed to load predictions: {}", error);
    }

    if let Some(text) = search {
        driver.dispatch(&mut view, ReviewMsg::Search(text)).await;
    }
    driver.dispatch(&mut view, ReviewMsg::Status(status)).await;
    if let Some(column) = sort {
        driver.dispatch(&mut view, ReviewMsg::Sort(column)).await;
        if desc {
            driver.dispatch(&mut view, ReviewMsg::Sort(column)).await;
        }
    }

    let table = view.table();
    let rows = table.visible_rows();
    if rows.is_empty() {
        println!("No predictions match.");
    } else {
        println!(
            "{:<12} {:<12} {:<8} {:<36} {:>6}  {:<9} CREATED",
            "ID", "PATIENT", "CODE", "DIAGNOSIS", "CONF", "STATUS"
        );
        for row in &rows {
            println!(
                "{:<12} {:<12} {:<8} {:<36} {:>6}  {:<9} {}",
                truncate(&row.id, 12),
                truncate(row.pac_id.as_deref().unwrap_or("-"), 12),
                row.main_code,
                truncate(&row.main_name, 36),
                format_probability(Some(row.main_confidence)).unwrap_or_default(),
                RowStatus::of(row).as_str(),
                row.created_at.format("%Y-%m-%d %H:%M"),
            );
        }
    }

    println!();
    print!("{} of {} rows", rows.len(), table.rows().len());
    if table.active_filter_count() > 0 {
        print!(" ({} filters active)", table.active_filter_count());
    }
    println!(", {} pending", view.pending_rows().len());

    Ok(())
}

fn print_prediction(prediction: &Prediction) {
    println!("Prediction {}", prediction.prediction_id);
    println!("  Case:    {}", prediction.case_id);
    if let Some(pac_id) = &prediction.pac_id {
        println!("  Patient: {}", pac_id);
    }
    println!("  Model:   {} ({} ms)", prediction.model_used, prediction.processing_time);
    println!("  Created: {}", prediction.created_at.format("%Y-%m-%d %H:%M"));
    println!();

    let main = &prediction.main_diagnosis;
    println!(
        "Main diagnosis: {} {} {}",
        main.code,
        main.name,
        format_probability(main.confidence).unwrap_or_default()
    );
    if let Some(reasoning) = &main.reasoning {
        println!("  {}", reasoning);
    }

    if !prediction.secondary_diagnoses.is_empty() {
        println!();
        println!("Secondary diagnoses:");
        for d in &prediction.secondary_diagnoses {
            println!(
                "  {:<8} {:>5}  {}",
                d.code,
                format_probability(d.confidence).unwrap_or_default(),
                d.name
            );
        }
    }

    if !prediction.step1_reasoning.is_empty() {
        println!();
        println!("Reasoning:");
        println!("  {}", prediction.step1_reasoning);
    }

    println!();
    if prediction.validated {
        println!(
            "Reviewed by {} ({})",
            prediction.validated_by.as_deref().unwrap_or("unknown"),
            prediction
                .feedback_type
                .as_ref()
                .map(|f| f.as_str())
                .unwrap_or("no feedback")
        );
        if let Some(comment) = &prediction.feedback_comment {
            println!("  {}", comment);
        }
    } else {
        println!("Awaiting review");
    }
}

/// Show one prediction
pub async fn show(id: &str) -> Result<()> {
    let driver = Driver::new(backend()?);
    let mut view = ReviewView::new(preferences()?, PredictionQuery::default());

    driver.dispatch(&mut view, ReviewMsg::OpenDetail(id.to_string())).await;
    let sheet = view.detail().context("Detail sheet closed unexpectedly")?;
    match &sheet.state {
        DetailState::Loaded(prediction) => {
            print_prediction(prediction);
            Ok(())
        }
        DetailState::Failed(error) => anyhow::bail!("Failed to load prediction {}: {}", id, error),
        DetailState::Loading => anyhow::bail!("Prediction {} did not load", id),
    }
}

/// Approve predictions as one bulk action
pub async fn approve(ids: Vec<String>, by: Option<String>, comment: Option<String>) -> Result<()> {
    let api = backend()?;
    let mut prefs = preferences()?;
    let validator = resolve_validator(by, &prefs)?;
    let feedback = FeedbackSubmission::approve(&validator, comment.as_deref())?;

    let page = api
        .list_predictions(PredictionQuery {
            limit: MAX_PAGE_SIZE,
            ..PredictionQuery::default()
        })
        .await
        .context("Failed to load predictions")?;

    let mut table = CaseTable::new(page.predictions);
    for id in &ids {
        if table.row(id).is_none() {
            eprintln!("Skipping unknown prediction: {}", id);
            continue;
        }
        table.set_selected(id, true);
    }
    if table.selected_count() == 0 {
        anyhow::bail!("Nothing to approve");
    }

    let outcome = table
        .run_bulk(BulkAction::Approve, |_, id| {
            let api = api.clone();
            let feedback = feedback.clone();
            async move { api.submit_feedback(&id, &feedback).await.map(|_| ()) }
        })
        .await;

    for id in &outcome.succeeded {
        println!("Approved {}", id);
    }
    for (id, error) in &outcome.failed {
        eprintln!("Failed {}: {}", id, error);
    }

    if !outcome.succeeded.is_empty() {
        prefs
            .set_validator_name(&validator)
            .context("Failed to save validator name")?;
    }
    if !outcome.is_complete_success() {
        let total = outcome.failed.len() + outcome.succeeded.len();
        anyhow::bail!("{} of {} approvals failed", outcome.failed.len(), total);
    }
    Ok(())
}

/// Reject a prediction with corrected codes
pub async fn reject(id: &str, args: RejectArgs, by: Option<String>) -> Result<()> {
    let api = backend()?;
    let prefs = preferences()?;
    let validator = resolve_validator(by, &prefs)?;

    let driver = Driver::new(api.clone());
    let mut view = ReviewView::new(prefs, PredictionQuery::default());

    driver.dispatch(&mut view, ReviewMsg::SetValidator(validator)).await;
    driver.dispatch(&mut view, ReviewMsg::OpenDetail(id.to_string())).await;
    let prediction = match view.detail().map(|sheet| &sheet.state) {
        Some(DetailState::Loaded(prediction)) => (**prediction).clone(),
        Some(DetailState::Failed(error)) => anyhow::bail!("Failed to load prediction {}: {}", id, error),
        _ => anyhow::bail!("Prediction {} did not load", id),
    };

    driver.dispatch(&mut view, ReviewMsg::BeginReject).await;

    let main_name = match args.main_name {
        Some(name) => name,
        None if args.main.eq_ignore_ascii_case(&prediction.main_diagnosis.code) => {
            prediction.main_diagnosis.name.clone()
        }
        None => lookup_name(&*api, &args.main).await,
    };
    driver
        .dispatch(
            &mut view,
            ReviewMsg::EditMain {
                code: args.main,
                name: main_name,
            },
        )
        .await;

    for (old, new) in args.replace {
        let index = secondary_index(&view, &old).with_context(|| format!("No secondary code {} to replace", old))?;
        let name = lookup_name(&*api, &new).await;
        driver
            .dispatch(&mut view, ReviewMsg::UpdateSecondary { index, code: new, name })
            .await;
    }
    for code in args.remove {
        let index = secondary_index(&view, &code).with_context(|| format!("No secondary code {} to remove", code))?;
        driver.dispatch(&mut view, ReviewMsg::RemoveSecondary(index)).await;
    }
    for (code, name) in args.secondary {
        driver.dispatch(&mut view, ReviewMsg::AddSecondary).await;
        let index = view
            .reject_editor()
            .map(|editor| editor.secondary.len().saturating_sub(1))
            .context("Rejection editor closed unexpectedly")?;
        driver
            .dispatch(&mut view, ReviewMsg::UpdateSecondary { index, code, name })
            .await;
    }

    driver.dispatch(&mut view, ReviewMsg::SetComment(args.comment)).await;
    driver.dispatch(&mut view, ReviewMsg::SubmitReject).await;

    match view.submission() {
        SubmitStatus::Saved => {
            println!("Rejected {}", id);
            Ok(())
        }
        SubmitStatus::Failed(error) => anyhow::bail!("Rejection failed: {}", error),
        _ => anyhow::bail!("Rejection was not submitted"),
    }
}

fn secondary_index(view: &ReviewView<JsonFileStore>, code: &str) -> Option<usize> {
    view.reject_editor()?
        .secondary
        .iter()
        .position(|row| row.code.eq_ignore_ascii_case(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer diagnosis name", 10), "a much ...");
    }
}
