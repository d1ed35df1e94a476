#![forbid(unsafe_code)]

use certflow_engines::canonical::canonical_json_string;
use certflow_engines::{
    build_issued_snapshot, compute_checksum, compute_outcome, compute_signing_hash,
    explain_outcome, validate_certificate_for_completion,
};
use certflow_kernel_contracts::certificate::CertificateAggregate;
use certflow_kernel_contracts::outcome::OutcomeResult;
use certflow_kernel_contracts::snapshot::CanonicalCertSnapshot;
use certflow_kernel_contracts::revision::CertificateRevision;
use certflow_kernel_contracts::Validate;
use serde_json::json;

pub const SUBCOMMANDS: &[&str] = &[
    "hash",
    "snapshot",
    "checksum",
    "outcome",
    "completion",
    "revision",
];

/// Runs one offline audit subcommand over the raw bytes of its input file.
pub fn execute_audit_command(subcommand: &str, input: &[u8]) -> Result<String, String> {
    match subcommand {
        "hash" => {
            let snapshot = issued_snapshot(&parse_aggregate(input)?);
            compute_signing_hash(&snapshot).map_err(|e| format!("failed to hash snapshot: {e}"))
        }
        "snapshot" => canonical_json_string(&issued_snapshot(&parse_aggregate(input)?))
            .map_err(|e| format!("failed to serialize snapshot: {e}")),
        "checksum" => Ok(compute_checksum(input)),
        "outcome" => {
            let aggregate = parse_aggregate(input)?;
            let result = outcome_of(&aggregate);
            let failing: Vec<&str> = result.failing_rules().map(|d| d.rule.as_str()).collect();
            to_pretty(&json!({
                "outcome": result.outcome,
                "reason": result.reason,
                "failing": failing,
                "explanation": explain_outcome(&result, &aggregate.observations),
            }))
        }
        "completion" => {
            let aggregate = parse_aggregate(input)?;
            let cert = &aggregate.certificate;
            let report = validate_certificate_for_completion(
                cert.cert_type.as_str(),
                cert.data_version,
                &cert.data,
                &aggregate.signatures,
            );
            to_pretty(&report)
        }
        "revision" => {
            let revision: CertificateRevision = serde_json::from_slice(input)
                .map_err(|e| format!("invalid revision json: {e}"))?;
            let recomputed = compute_signing_hash(&revision.content)
                .map_err(|e| format!("failed to hash snapshot: {e}"))?;
            if recomputed == revision.signing_hash {
                Ok(format!("OK r{} {recomputed}", revision.revision))
            } else {
                tracing::warn!(
                    certificate_id = %revision.certificate_id,
                    revision = revision.revision,
                    "stored signing hash does not match content"
                );
                Err(format!(
                    "MISMATCH r{} stored={} recomputed={recomputed}",
                    revision.revision, revision.signing_hash
                ))
            }
        }
        _ => Err(format!(
            "unknown subcommand: {subcommand}. expected one of: {}",
            SUBCOMMANDS.join(", ")
        )),
    }
}

fn outcome_of(aggregate: &CertificateAggregate) -> OutcomeResult {
    compute_outcome(
        aggregate.certificate.cert_type.as_str(),
        &aggregate.observations,
        &aggregate.checklists,
        &aggregate.test_results,
    )
}

/// The snapshot issuance would sign for `aggregate` as it stands.
fn issued_snapshot(aggregate: &CertificateAggregate) -> CanonicalCertSnapshot {
    build_issued_snapshot(aggregate, &outcome_of(aggregate))
}

fn parse_aggregate(input: &[u8]) -> Result<CertificateAggregate, String> {
    let aggregate: CertificateAggregate =
        serde_json::from_slice(input).map_err(|e| format!("invalid aggregate json: {e}"))?;
    aggregate
        .validate()
        .map_err(|e| format!("invalid aggregate: {e}"))?;
    Ok(aggregate)
}

fn to_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("failed to render output: {e}"))
}
