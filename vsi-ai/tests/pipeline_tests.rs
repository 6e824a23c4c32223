//! End-to-end analysis pipeline tests
//!
//! Drives `BatchAggregator` against a scripted provider: chunking, both
//! passes, fusion, rule engine and aggregation.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::{
    aggregator, aggregator_with, capture_logs, descriptive_entry, images, no_tags, per_image,
    quiet_response, Pass, ScriptedProvider,
};
use serde_json::json;
use vsi_ai::models::{Condition, Severity};
use vsi_ai::services::InferenceError;
use vsi_ai::utils::RetryPolicy;
use vsi_ai::AnalysisError;

fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
    }
}

// ============================================================================
// Chunking and aggregation
// ============================================================================

#[tokio::test]
async fn test_seventeen_images_in_three_chunks() {
    let provider = Arc::new(ScriptedProvider::new(|pass, ids, _| {
        assert!(ids.len() <= 8, "chunk of {} images", ids.len());
        Ok(quiet_response(pass, ids))
    }));
    let batch = images(17);

    let result = aggregator(provider.clone(), 8).run(&batch).await.unwrap();

    assert_eq!(provider.calls(Pass::Descriptive), 3);
    assert_eq!(provider.calls(Pass::Checker), 3);
    assert_eq!(result.summary.total(), 17);
    assert_eq!(result.summary.none_count, 17);
    assert!(result.unassessed.is_empty());

    let ids: Vec<&str> = result.assessments.iter().map(|a| a.id.as_str()).collect();
    let expected: Vec<&str> = batch.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_output_follows_input_order_when_model_reorders() {
    let provider = Arc::new(ScriptedProvider::new(|pass, ids, _| {
        let mut reversed = ids.to_vec();
        reversed.reverse();
        Ok(quiet_response(pass, &reversed))
    }));
    let batch = images(5);

    let result = aggregator(provider, 3).run(&batch).await.unwrap();

    let ids: Vec<&str> = result.assessments.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, ["img-00.jpg", "img-01.jpg", "img-02.jpg", "img-03.jpg", "img-04.jpg"]);
}

#[tokio::test]
async fn test_summary_counts_match_assessments() {
    let provider = Arc::new(ScriptedProvider::new(|pass, ids, _| {
        let entries = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let mut tags = no_tags();
                match i % 3 {
                    0 => tags["fire_hazard"]["combustibles"] = json!(true),
                    1 => tags["trip_fall"]["broken_railing"] = json!(true),
                    _ => {}
                }
                match pass {
                    Pass::Descriptive => {
                        let mut entry = descriptive_entry(id);
                        entry["tags"] = tags;
                        entry
                    }
                    Pass::Checker => json!({ "id": id, "tags": tags }),
                }
            })
            .collect();
        Ok(per_image(entries))
    }));

    let result = aggregator(provider, 8).run(&images(6)).await.unwrap();

    assert_eq!(result.summary.fire_hazard_count, 2);
    assert_eq!(result.summary.trip_fall_count, 2);
    assert_eq!(result.summary.none_count, 2);
    assert_eq!(result.summary.total(), result.assessments.len());
}

// ============================================================================
// Fusion and classification
// ============================================================================

#[tokio::test]
async fn test_checker_tag_alone_raises_fire_hazard() {
    let provider = Arc::new(ScriptedProvider::new(|pass, ids, _| match pass {
        Pass::Descriptive => Ok(quiet_response(pass, ids)),
        Pass::Checker => {
            let mut tags = no_tags();
            tags["fire_hazard"]["combustibles"] = json!(true);
            Ok(per_image(vec![json!({ "id": ids[0], "tags": tags })]))
        }
    }));

    let result = aggregator(provider, 8).run(&images(2)).await.unwrap();

    let first = &result.assessments[0];
    assert_eq!(first.condition, Condition::FireHazard);
    assert_eq!(first.severity, Severity::Medium);
    assert!(first.tags.fire_hazard.combustibles);
    assert_eq!(first.recommendations.len(), 1);
    assert!(first.recommendations[0].starts_with("Remove combustibles"));

    // No checker entry for the second image: descriptive tags stand
    assert_eq!(result.assessments[1].condition, Condition::NoHazard);
}

#[tokio::test]
async fn test_rust_needs_both_passes_and_corrosion_words() {
    let provider = Arc::new(ScriptedProvider::new(|pass, ids, _| {
        let entries = ids
            .iter()
            .map(|id| {
                let mut tags = no_tags();
                tags["rust_stains"] = json!(true);
                match pass {
                    Pass::Descriptive => {
                        let mut entry = descriptive_entry(id);
                        entry["tags"] = tags;
                        if id == "img-00.jpg" {
                            entry["description"] = json!("Bulwark plating heavily corroded near the scupper.");
                        }
                        entry
                    }
                    Pass::Checker => json!({ "id": id, "tags": tags }),
                }
            })
            .collect();
        Ok(per_image(entries))
    }));

    let result = aggregator(provider, 8).run(&images(2)).await.unwrap();

    let evidenced = &result.assessments[0];
    assert!(evidenced.tags.rust_stains);
    assert_eq!(evidenced.condition, Condition::NoHazard);
    assert_eq!(evidenced.severity, Severity::Low);
    assert_eq!(evidenced.recommendations.len(), 1);
    assert!(evidenced.recommendations[0].starts_with("Derust"));

    // Both passes agree but the text never mentions corrosion
    let unsupported = &result.assessments[1];
    assert!(!unsupported.tags.rust_stains);
    assert!(unsupported.recommendations.is_empty());
}

#[tokio::test]
async fn test_model_condition_and_recommendations_are_not_trusted() {
    let provider = Arc::new(ScriptedProvider::new(|pass, ids, _| match pass {
        Pass::Descriptive => {
            let mut entry = descriptive_entry(&ids[0]);
            entry["condition"] = json!("fire_hazard");
            entry["severity"] = json!("high");
            entry["recommendations"] = json!(["Evacuate the vessel."]);
            entry["comment"] = json!("Looks fine overall.");
            Ok(per_image(vec![entry]))
        }
        Pass::Checker => Ok(quiet_response(pass, ids)),
    }));

    let result = aggregator(provider, 8).run(&images(1)).await.unwrap();

    let assessment = &result.assessments[0];
    assert_eq!(assessment.condition, Condition::NoHazard);
    assert_eq!(assessment.severity, Severity::Low);
    assert!(assessment.recommendations.is_empty());
    assert_eq!(
        assessment.comment,
        "Area appears tidy with clear walk path and safe stowage."
    );
}

#[tokio::test]
async fn test_trip_severity_keeps_asserted_high_only() {
    let provider = Arc::new(ScriptedProvider::new(|pass, ids, _| {
        let entries = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let mut tags = no_tags();
                tags["trip_fall"]["obstructed_walkway"] = json!(true);
                match pass {
                    Pass::Descriptive => {
                        let mut entry = descriptive_entry(id);
                        entry["tags"] = tags;
                        entry["severity"] = json!(if i == 0 { "high" } else { "low" });
                        entry
                    }
                    Pass::Checker => json!({ "id": id, "tags": tags }),
                }
            })
            .collect();
        Ok(per_image(entries))
    }));

    let result = aggregator(provider, 8).run(&images(2)).await.unwrap();

    assert_eq!(result.assessments[0].condition, Condition::TripFall);
    assert_eq!(result.assessments[0].severity, Severity::High);
    assert_eq!(result.assessments[1].severity, Severity::Medium);
}

// ============================================================================
// Lenient parsing
// ============================================================================

#[tokio::test]
async fn test_fenced_output_with_trailing_commas_is_repaired() {
    let provider = Arc::new(ScriptedProvider::new(|pass, ids, _| match pass {
        Pass::Descriptive => Ok(format!(
            "```json\n{{\"per_image\": [{{\"id\": \"{}\", \"comment\": \"Hose stowed on rack.\", \"severity\": \"low\",}},]}}\n```",
            ids[0]
        )),
        Pass::Checker => Ok(quiet_response(pass, ids)),
    }));

    let result = aggregator(provider, 8).run(&images(1)).await.unwrap();

    assert_eq!(result.assessments.len(), 1);
    assert_eq!(result.assessments[0].comment, "Hose stowed on rack.");
    assert!(result.unassessed.is_empty());
}

#[tokio::test]
async fn test_unusable_descriptive_output_marks_chunk_unassessed() {
    let provider = Arc::new(ScriptedProvider::new(|pass, ids, _| {
        if pass == Pass::Descriptive && ids[0] == "img-00.jpg" {
            return Ok("I'm sorry, I cannot help with that.".to_string());
        }
        Ok(quiet_response(pass, ids))
    }));

    let result = aggregator(provider, 2).run(&images(4)).await.unwrap();

    assert_eq!(result.unassessed, ["img-00.jpg", "img-01.jpg"]);
    let ids: Vec<&str> = result.assessments.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, ["img-02.jpg", "img-03.jpg"]);
    assert_eq!(result.summary.total(), 2);
}

#[tokio::test]
async fn test_unknown_ids_from_model_are_dropped() {
    let provider = Arc::new(ScriptedProvider::new(|pass, ids, _| {
        let mut with_stranger = ids.to_vec();
        with_stranger.push("not-in-batch.jpg".to_string());
        Ok(quiet_response(pass, &with_stranger))
    }));

    let result = aggregator(provider, 8).run(&images(2)).await.unwrap();

    assert_eq!(result.assessments.len(), 2);
    assert!(result.assessments.iter().all(|a| a.id != "not-in-batch.jpg"));
}

// ============================================================================
// Failure handling
// ============================================================================

#[tokio::test]
async fn test_chunk_failure_fails_whole_run() {
    let provider = Arc::new(ScriptedProvider::new(|pass, ids, _| {
        if ids[0] == "img-02.jpg" {
            return Err(InferenceError::Provider {
                status: 400,
                message: "content filtered".to_string(),
            });
        }
        Ok(quiet_response(pass, ids))
    }));

    let err = aggregator(provider.clone(), 2)
        .run(&images(6))
        .await
        .unwrap_err();

    match err {
        AnalysisError::Inference { chunk_index, source } => {
            assert_eq!(chunk_index, 1);
            assert!(matches!(source, InferenceError::Provider { status: 400, .. }));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    // Third chunk never started
    assert_eq!(provider.calls(Pass::Descriptive), 2);
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let provider = Arc::new(ScriptedProvider::new(|pass, ids, previous| {
        if pass == Pass::Descriptive && previous == 0 {
            return Err(InferenceError::Provider {
                status: 503,
                message: "busy".to_string(),
            });
        }
        Ok(quiet_response(pass, ids))
    }));

    let result = aggregator_with(provider.clone(), 8, fast_retry(2), Duration::from_secs(5))
        .run(&images(3))
        .await
        .unwrap();

    assert_eq!(result.assessments.len(), 3);
    assert_eq!(provider.calls(Pass::Descriptive), 2);
    assert_eq!(provider.calls(Pass::Checker), 1);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let provider = Arc::new(ScriptedProvider::new(|pass, ids, _| {
        if pass == Pass::Checker {
            return Err(InferenceError::Provider {
                status: 401,
                message: "bad key".to_string(),
            });
        }
        Ok(quiet_response(pass, ids))
    }));

    let err = aggregator_with(provider.clone(), 8, fast_retry(3), Duration::from_secs(5))
        .run(&images(1))
        .await
        .unwrap_err();

    assert!(matches!(err, AnalysisError::Inference { chunk_index: 0, .. }));
    assert_eq!(provider.calls(Pass::Checker), 1);
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let provider = Arc::new(
        ScriptedProvider::new(|pass, ids, _| Ok(quiet_response(pass, ids)))
            .with_delay(Duration::from_millis(500)),
    );

    let err = aggregator_with(provider, 8, RetryPolicy::none(), Duration::from_millis(20))
        .run(&images(1))
        .await
        .unwrap_err();

    match err {
        AnalysisError::Inference { source, .. } => assert!(source.is_timeout()),
        other => panic!("unexpected error: {:?}", other),
    }
}

// ============================================================================
// Logging
// ============================================================================

#[tokio::test]
async fn test_run_logs_start_and_completion() {
    let (logs, _guard) = capture_logs();
    let provider = Arc::new(ScriptedProvider::new(|pass, ids, _| Ok(quiet_response(pass, ids))));

    aggregator(provider, 4).run(&images(5)).await.unwrap();

    logs.assert_contains("Starting analysis run");
    logs.assert_contains("Analysis run complete");
    assert_eq!(logs.count_matching("Chunk processed"), 2);
}
