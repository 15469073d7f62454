//! Embedded JSON Schemas for stage output and identity files.

use std::sync::LazyLock;

use serde_json::Value;

use crate::core::types::StageName;

const TOPIC_SCHEMA: &str = include_str!("../../schemas/topic.schema.json");
const RESEARCH_SCHEMA: &str = include_str!("../../schemas/research.schema.json");
const HOOK_SCHEMA: &str = include_str!("../../schemas/hook.schema.json");
const BODY_SCHEMA: &str = include_str!("../../schemas/body.schema.json");
const CTA_SCHEMA: &str = include_str!("../../schemas/cta.schema.json");
const REVIEW_SCHEMA: &str = include_str!("../../schemas/review.schema.json");
const ASSEMBLY_SCHEMA: &str = include_str!("../../schemas/assembly.schema.json");
pub const IDENTITY_SCHEMA: &str = include_str!("../../schemas/identity.schema.json");

static STAGE_SCHEMAS: LazyLock<Vec<(StageName, Value)>> = LazyLock::new(|| {
    StageName::ORDER
        .into_iter()
        .map(|stage| {
            let raw = match stage {
                StageName::TopicSelection => TOPIC_SCHEMA,
                StageName::Research => RESEARCH_SCHEMA,
                StageName::HookGeneration => HOOK_SCHEMA,
                StageName::BodyGeneration => BODY_SCHEMA,
                StageName::CtaGeneration => CTA_SCHEMA,
                StageName::QualityReview => REVIEW_SCHEMA,
                StageName::Assembly => ASSEMBLY_SCHEMA,
            };
            let schema = serde_json::from_str(raw).expect("embedded stage schema should be valid");
            (stage, schema)
        })
        .collect()
});

static IDENTITY_SCHEMA_VALUE: LazyLock<Value> = LazyLock::new(|| {
    serde_json::from_str(IDENTITY_SCHEMA).expect("embedded identity schema should be valid")
});

/// Output schema the model must satisfy for `stage`.
pub fn output_schema(stage: StageName) -> Value {
    STAGE_SCHEMAS
        .iter()
        .find(|(name, _)| *name == stage)
        .map(|(_, schema)| schema.clone())
        .unwrap_or(Value::Bool(true))
}

pub fn identity_schema() -> &'static Value {
    &IDENTITY_SCHEMA_VALUE
}
