//! Golden test vectors for deterministic verification.
//!
//! Each vector pins an event's canonical rendering and its SHA-256 hash, so
//! any producer or verifier can be checked for byte-identical output.

use serde_json::json;

use ledgerline_core::{Event, EventBuilder, EventHash, EventKind};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Builds the event under test.
    pub build: fn() -> Event,
    /// Expected canonical content (the hash input).
    pub canonical: &'static str,
    /// Expected hash, `sha256:<hex>`.
    pub hash: &'static str,
}

impl GoldenVector {
    /// The event this vector describes.
    pub fn event(&self) -> Event {
        (self.build)()
    }
}

const CREATED_HASH: &str =
    "sha256:6e479e47b6fc26f558941dee225bcaa6a0c8d62966745695a9938c57cdfdd4ee";

fn application_created() -> Event {
    EventBuilder::new(EventKind::ApplicationCreated)
        .timestamp(1_736_870_400_000)
        .field("applicationId", "A-1001")
        .field("amount", 25_000.0)
        .field("status", "CREATED")
        .build()
}

fn decision_overridden() -> Event {
    let mut builder = EventBuilder::new(EventKind::DecisionOverridden)
        .timestamp(1_736_870_460_000)
        .field("applicationId", "A-1001")
        .field("reason", "manual underwriting review")
        .field("newStatus", "OVERRIDDEN");
    // The predecessor's hash is itself a vector; it never enters the hash input.
    if let Ok(prev) = CREATED_HASH.parse::<EventHash>() {
        builder = builder.prev(prev);
    }
    builder.build()
}

fn ai_version_registered() -> Event {
    EventBuilder::new(EventKind::AiVersionRegistered)
        .timestamp(1_736_870_500_000)
        .field("modelId", "credit-risk")
        .field("version", "2.1.0")
        .field("repoUrl", "https://git.example.org/ml/credit-risk")
        .field("artifactHash", "sha256:0f1e2d3c")
        .field("description", "gradient boosted trees")
        .build()
}

fn ai_version_evaluated() -> Event {
    EventBuilder::new(EventKind::AiVersionEvaluated)
        .timestamp(1_736_870_600_000)
        .field("modelId", "credit-risk")
        .field("version", "2.1.0")
        .field("evalId", "eval-7")
        .field("dataset", "holdout-2024Q4")
        .field("metrics", json!({ "ks": 0.42, "auc": 0.91, "n": 10_000.0 }))
        .field("passed", true)
        .field("notes", serde_json::Value::Null)
        .build()
}

fn non_ascii_identifier() -> Event {
    EventBuilder::new(EventKind::ApplicationCreated)
        .timestamp(0)
        .field("applicationId", "Zoë-7")
        .field("amount", 1.5)
        .build()
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "ApplicationCreated chain head",
            build: application_created,
            canonical: r#"{"payload":{"amount":25000,"applicationId":"A-1001","status":"CREATED"},"timestamp":1736870400000,"type":"ApplicationCreated"}"#,
            hash: CREATED_HASH,
        },
        GoldenVector {
            name: "DecisionOverridden linked to creation",
            build: decision_overridden,
            canonical: r#"{"payload":{"applicationId":"A-1001","newStatus":"OVERRIDDEN","reason":"manual underwriting review"},"timestamp":1736870460000,"type":"DecisionOverridden"}"#,
            hash: "sha256:1b92a2ee9e4973d8e6f287cae706d0dc38317a59f0c79411df75cd642a269593",
        },
        GoldenVector {
            name: "AIVersionRegistered with description",
            build: ai_version_registered,
            canonical: r#"{"payload":{"artifactHash":"sha256:0f1e2d3c","description":"gradient boosted trees","modelId":"credit-risk","repoUrl":"https://git.example.org/ml/credit-risk","version":"2.1.0"},"timestamp":1736870500000,"type":"AIVersionRegistered"}"#,
            hash: "sha256:cf6119d89835f07105a57396b564538834f706b24ffdccd8dcaca9ba55c0c33f",
        },
        GoldenVector {
            name: "AIVersionEvaluated with null notes",
            build: ai_version_evaluated,
            canonical: r#"{"payload":{"dataset":"holdout-2024Q4","evalId":"eval-7","metrics":{"auc":0.91,"ks":0.42,"n":10000},"modelId":"credit-risk","passed":true,"version":"2.1.0"},"timestamp":1736870600000,"type":"AIVersionEvaluated"}"#,
            hash: "sha256:c5eaedec143bc9ea96ef44f6e62d7104c91b3de03bf8939d8d4527adc5743ba4",
        },
        GoldenVector {
            name: "Non-ASCII application id",
            build: non_ascii_identifier,
            canonical: r#"{"payload":{"amount":1.5,"applicationId":"Zoë-7"},"timestamp":0,"type":"ApplicationCreated"}"#,
            hash: "sha256:d842d9b7c77f3336251b6613de9b5e9e89ed80f8b3e95c63d4cb303255e59606",
        },
    ]
}

/// Check every vector, returning `(name, matches, computed hash)`.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let event = v.event();
            let computed = match (event.canonical_content(), event.compute_hash()) {
                (Ok(content), Ok(hash)) if content == v.canonical => hash.to_string(),
                (Ok(_), Ok(hash)) => format!("canonical mismatch ({hash})"),
                (Err(e), _) | (_, Err(e)) => e.to_string(),
            };
            (v.name.to_string(), computed == v.hash, computed)
        })
        .collect()
}
