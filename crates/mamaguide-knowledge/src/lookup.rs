//! Structured lookups over the knowledge document.
//!
//! Name matching is a case-insensitive substring test, so an empty name
//! matches every record.

use serde_json::Value;

use crate::document::{
    FaqEntry, KnowledgeDocument, Medication, NutritionalRequirements, PostTermInfo, Symptom,
    WeekGuidance, WeekInfo,
};

/// Pregnancy weeks covered by each timeline key.
const WEEK_RANGES: &[(u32, u32, &str)] = &[
    (1, 4, "weeks1to4"),
    (5, 8, "weeks5to8"),
    (9, 12, "weeks9to12"),
    (13, 16, "weeks13to16"),
    (17, 20, "weeks17to20"),
    (21, 24, "weeks21to24"),
    (25, 28, "weeks25to28"),
    (29, 32, "weeks29to32"),
    (33, 36, "weeks33to36"),
    (37, 40, "weeks37to40"),
];

const POST_TERM_KEY: &str = "weeks40plus";

/// Timeline key for a pregnancy week. Week 0 has none.
pub fn week_key(week: u32) -> Option<&'static str> {
    if week > 40 {
        return Some(POST_TERM_KEY);
    }
    WEEK_RANGES
        .iter()
        .find(|(min, max, _)| (*min..=*max).contains(&week))
        .map(|(_, _, key)| *key)
}

pub fn week_info(doc: &KnowledgeDocument, week: u32) -> Option<WeekGuidance> {
    let key = week_key(week)?;
    let fragment = doc.topic("pregnancyTimeline")?.get(key)?;

    if key == POST_TERM_KEY {
        let info: PostTermInfo = KnowledgeDocument::view(fragment)?;
        Some(WeekGuidance::PostTerm { info })
    } else {
        let info: WeekInfo = KnowledgeDocument::view(fragment)?;
        Some(WeekGuidance::Range {
            key: key.to_string(),
            info,
        })
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Every medication record, annotated with its condition.
pub fn medications(doc: &KnowledgeDocument) -> Vec<Medication> {
    let Some(conditions) = doc
        .topic("medications")
        .and_then(|m| m.get("byCondition"))
        .and_then(Value::as_array)
    else {
        return vec![];
    };

    conditions
        .iter()
        .flat_map(|condition| {
            let name = condition
                .get("condition")
                .and_then(Value::as_str)
                .map(str::to_string);
            condition
                .get("medications")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(KnowledgeDocument::view::<Medication>)
                .map(move |mut med| {
                    med.condition = name.clone();
                    med
                })
        })
        .collect()
}

/// Medications whose drug or brand name contains `name`.
pub fn check_medication_safety(doc: &KnowledgeDocument, name: &str) -> Vec<Medication> {
    medications(doc)
        .into_iter()
        .filter(|m| {
            contains_ci(&m.drug, name) || m.brand.as_deref().is_some_and(|b| contains_ci(b, name))
        })
        .collect()
}

/// Medications listed under `condition` (case-insensitive equality).
pub fn medications_for_condition(doc: &KnowledgeDocument, condition: &str) -> Vec<Medication> {
    medications(doc)
        .into_iter()
        .filter(|m| {
            m.condition
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(condition.trim()))
        })
        .collect()
}

/// Every warning sign, annotated with its category.
pub fn symptoms(doc: &KnowledgeDocument) -> Vec<Symptom> {
    let Some(categories) = doc
        .topic("symptomTroubleshooting")
        .and_then(|s| s.get("categories"))
        .and_then(Value::as_array)
    else {
        return vec![];
    };

    categories
        .iter()
        .flat_map(|category| {
            let name = category
                .get("category")
                .and_then(Value::as_str)
                .map(str::to_string);
            category
                .get("symptoms")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(KnowledgeDocument::view::<Symptom>)
                .map(move |mut symptom| {
                    symptom.category = name.clone();
                    symptom
                })
        })
        .collect()
}

/// Warning signs whose description contains `sign`.
pub fn symptom_info(doc: &KnowledgeDocument, sign: &str) -> Vec<Symptom> {
    symptoms(doc)
        .into_iter()
        .filter(|s| contains_ci(&s.sign, sign))
        .collect()
}

pub fn symptoms_in_category(doc: &KnowledgeDocument, category: &str) -> Vec<Symptom> {
    symptoms(doc)
        .into_iter()
        .filter(|s| {
            s.category
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(category.trim()))
        })
        .collect()
}

pub fn symptoms_by_severity(doc: &KnowledgeDocument, severity: &str) -> Vec<Symptom> {
    symptoms(doc)
        .into_iter()
        .filter(|s| {
            s.severity
                .as_deref()
                .is_some_and(|v| v.eq_ignore_ascii_case(severity.trim()))
        })
        .collect()
}

/// High-severity warning signs.
pub fn emergency_symptoms(doc: &KnowledgeDocument) -> Vec<Symptom> {
    symptoms(doc)
        .into_iter()
        .filter(Symptom::is_high_severity)
        .collect()
}

pub fn nutritional_requirements(doc: &KnowledgeDocument) -> NutritionalRequirements {
    doc.topic("nutritionalRequirements")
        .and_then(KnowledgeDocument::view)
        .unwrap_or_default()
}

pub fn common_questions(doc: &KnowledgeDocument) -> Vec<FaqEntry> {
    doc.topic("commonQuestions")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(KnowledgeDocument::view)
        .collect()
}
