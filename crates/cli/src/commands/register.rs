use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Deserialize;
use shema_api::ApiClient;
use shema_core::{PaymentProof, RegistrationForm, ScheduleChoice, ScheduleSelection};
use shema_service::RegistrationService;

use crate::draft::{DraftStore, FinalRegistration};
use crate::print_json;

/// `register` input: the personal data form plus up to two schedules.
#[derive(Debug, Deserialize)]
struct RegistrationFile {
    #[serde(flatten)]
    form: RegistrationForm,
    #[serde(default)]
    schedules: Vec<ScheduleChoice>,
}

pub(crate) struct PaymentArgs<'a> {
    pub proof_url: &'a str,
    pub method: &'a str,
    pub captcha_token: &'a str,
}

pub(crate) async fn run_register(
    api: Arc<ApiClient>,
    store: &DraftStore,
    form_path: &Path,
    payment: PaymentArgs<'_>,
) -> Result<()> {
    let raw = std::fs::read_to_string(form_path)
        .with_context(|| format!("reading registration form from {}", form_path.display()))?;
    let file: RegistrationFile = serde_json::from_str(&raw).context("parsing registration form")?;

    let mut schedules = ScheduleSelection::default();
    for choice in file.schedules {
        schedules.add(choice)?;
    }

    let mut draft = store.load().unwrap_or_else(|e| {
        tracing::warn!("discarding unreadable draft: {e:#}");
        Default::default()
    });
    draft.form = Some(file.form.clone());
    draft.schedules = schedules.clone();
    draft.registration = None;
    store.save(&draft)?;

    let proof = PaymentProof {
        method: payment.method.to_owned(),
        proof_url: payment.proof_url.to_owned(),
        captcha_token: payment.captcha_token.to_owned(),
    };
    let confirmation =
        RegistrationService::new(api).register(&file.form, &schedules, &proof).await?;

    draft.registration = Some(FinalRegistration {
        booking_id: confirmation.booking_id.clone(),
        payment_method: proof.method,
        proof_url: proof.proof_url,
        submitted_at: Utc::now(),
    });
    store.save(&draft)?;

    print_json(&confirmation)
}
