//! Section flattener: one extractor per topic turns the nested document into
//! flat `{ id, content }` sections.
//!
//! Extractors read their fragment leniently. Absent fields are left out of the
//! rendered text, and a record with nothing to say produces no section.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use crate::document::KnowledgeDocument;
use crate::section::{Section, slugify};

type Extractor = fn(&Value) -> Vec<Section>;

/// Topics in emission order.
const EXTRACTORS: &[(&str, Extractor)] = &[
    ("nutritionalRequirements", nutrition),
    ("foodSafety", food_safety),
    ("morningSicknessManagement", morning_sickness),
    ("pregnancyTimeline", timeline),
    ("symptomTroubleshooting", symptoms),
    ("medications", medications),
    ("laborAndDelivery", labor),
    ("hospitalPreparation", hospital_bag),
    ("babyGear", baby_gear),
    ("commonQuestions", common_questions),
    ("exerciseGuidelines", exercise),
    ("travelGuidelines", travel),
];

/// Sections plus per-topic diagnostics from one flatten pass.
#[derive(Debug, Clone, Default)]
pub struct FlattenReport {
    pub sections: Vec<Section>,
    /// Sections emitted per topic key (zero for missing topics).
    pub topic_counts: BTreeMap<String, usize>,
    /// Ids emitted more than once. Always empty for a well-formed document.
    pub duplicate_ids: Vec<String>,
}

/// Flatten a document into sections.
pub fn flatten(doc: &KnowledgeDocument) -> Vec<Section> {
    flatten_report(doc).sections
}

pub fn flatten_report(doc: &KnowledgeDocument) -> FlattenReport {
    let mut report = FlattenReport::default();

    for (topic, extract) in EXTRACTORS {
        let emitted = match doc.topic(topic) {
            Some(fragment) => extract(fragment),
            None => {
                tracing::debug!("📚 Topic '{topic}' not present in knowledge document");
                vec![]
            }
        };
        tracing::debug!("📚 {topic}: {} sections", emitted.len());
        report.topic_counts.insert((*topic).to_string(), emitted.len());
        report.sections.extend(emitted);
    }

    let mut seen = HashSet::new();
    for section in &report.sections {
        if !seen.insert(section.id.as_str()) {
            tracing::error!("❌ Duplicate knowledge section id '{}'", section.id);
            report.duplicate_ids.push(section.id.clone());
        }
    }

    tracing::debug!("📚 Flattened {} knowledge sections", report.sections.len());
    report
}

// ── Field helpers ───────────────────────────────────────────

/// A scalar rendered as text. Blank strings count as absent.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn field(value: &Value, key: &str) -> Option<String> {
    text(value.get(key)?)
}

/// A scalar, or a list of scalars joined with ", ".
fn list(value: &Value) -> Option<String> {
    match value {
        Value::Array(_) => list_of(value, text),
        other => text(other),
    }
}

/// Render each array element with `render` and join the non-empty results.
fn list_of(value: &Value, render: impl Fn(&Value) -> Option<String>) -> Option<String> {
    join_present(value.as_array()?.iter().map(render), ", ")
}

fn join_present(parts: impl IntoIterator<Item = Option<String>>, sep: &str) -> Option<String> {
    let parts: Vec<String> = parts.into_iter().flatten().collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(sep))
    }
}

fn labelled(label: &str, value: Option<String>) -> Option<String> {
    value.map(|v| format!("{label}{v}"))
}

/// `"{head}: {body}"`, or just the head when there is no body.
fn headed(head: String, body: Option<String>) -> String {
    match body {
        Some(body) => format!("{head}: {body}"),
        None => head,
    }
}

fn entries(value: &Value) -> impl Iterator<Item = (&String, &Value)> {
    value.as_object().into_iter().flat_map(|map| map.iter())
}

// ── Extractors ──────────────────────────────────────────────

fn nutrition(fragment: &Value) -> Vec<Section> {
    let mut out = Vec::new();

    let daily = list_of(&fragment["dailyMacros"], |n| {
        let name = field(n, "nutrient")?;
        let amount = join_present([field(n, "amount"), field(n, "unit")], " ");
        let mut line = headed(name, amount);
        if let Some(category) = field(n, "category") {
            line.push_str(&format!(" ({category})"));
        }
        Some(line)
    });
    if let Some(daily) = daily {
        out.push(Section::new(
            "nutrition-daily",
            format!("Daily nutritional requirements during pregnancy: {daily}"),
        ));
    }

    let weight = list_of(&fragment["weightGainRecommendations"], |r| {
        let mut head = field(r, "prePregnancyBMI")?;
        if let Some(range) = field(r, "bmiRange") {
            head.push_str(&format!(" (BMI {range})"));
        }
        let gain = join_present([field(r, "recommendedGain"), field(r, "unit")], " ");
        Some(headed(head, gain))
    });
    if let Some(weight) = weight {
        out.push(Section::new(
            "nutrition-weight",
            format!("Weight gain recommendations: {weight}"),
        ));
    }

    out
}

fn food_safety(fragment: &Value) -> Vec<Section> {
    let unsafe_seafood = labelled(
        "Unsafe seafood: ",
        list(&fragment["seafoodGuidelines"]["unsafe"]),
    );
    let avoid = list_of(&fragment["avoidFoods"], |f| field(f, "item"));

    join_present([unsafe_seafood, avoid], ". ")
        .map(|body| Section::new("food-safety", format!("Foods to avoid during pregnancy: {body}")))
        .into_iter()
        .collect()
}

fn morning_sickness(fragment: &Value) -> Vec<Section> {
    let body = join_present(
        [
            labelled("Eat ", list(&fragment["whatToEat"])),
            labelled("Avoid ", list(&fragment["avoidFoods"])),
            labelled("Tips: ", list(&fragment["eatingTips"])),
        ],
        ". ",
    );

    body.map(|body| Section::new("morning-sickness", format!("Morning sickness management: {body}")))
        .into_iter()
        .collect()
}

fn timeline(fragment: &Value) -> Vec<Section> {
    entries(fragment)
        .filter_map(|(key, week)| {
            if key == "weeks40plus" {
                let body = join_present(
                    [
                        labelled("Timeline - ", field(week, "timeline")),
                        labelled("Status - ", field(week, "status")),
                        labelled("What to expect - ", list(&week["whatToExpect"])),
                    ],
                    ". ",
                )?;
                return Some(Section::new(
                    "timeline-overdue",
                    format!("Post-term pregnancy (40+ weeks): {body}"),
                ));
            }

            let title = field(week, "title");
            let body = join_present(
                [
                    labelled(
                        "Common symptoms include ",
                        list_of(&week["commonSymptoms"], |s| {
                            let symptom = field(s, "symptom")?;
                            Some(headed_dash(symptom, field(s, "status")))
                        }),
                    ),
                    labelled(
                        "Recommended exercise: ",
                        week.get("exercise").and_then(|ex| {
                            let name = field(ex, "name")?;
                            Some(headed_dash(name, field(ex, "benefits")))
                        }),
                    ),
                ],
                ". ",
            );
            if title.is_none() && body.is_none() {
                return None;
            }

            let mut head = title.unwrap_or_else(|| key.clone());
            if let Some(trimester) = field(week, "trimester") {
                head.push_str(&format!(" ({trimester} trimester)"));
            }
            Some(Section::new(format!("timeline-{}", slugify(key)), headed(head, body)))
        })
        .collect()
}

fn headed_dash(head: String, tail: Option<String>) -> String {
    match tail {
        Some(tail) => format!("{head} - {tail}"),
        None => head,
    }
}

fn symptoms(fragment: &Value) -> Vec<Section> {
    let mut out = Vec::new();
    let Some(categories) = fragment["categories"].as_array() else {
        return out;
    };

    for category in categories {
        let name = field(category, "category");
        let Some(signs) = category["symptoms"].as_array() else {
            continue;
        };
        for symptom in signs {
            let Some(sign) = field(symptom, "sign") else {
                continue;
            };
            let id = match &name {
                Some(cat) => format!("symptom-{}-{}", slugify(cat), slugify(&sign)),
                None => format!("symptom-{}", slugify(&sign)),
            };
            let head = match &name {
                Some(cat) => format!("{sign} ({cat})"),
                None => sign,
            };
            let body = join_present(
                [
                    field(symptom, "action"),
                    labelled("Urgency: ", field(symptom, "urgency")),
                    labelled("Severity: ", field(symptom, "severity")),
                ],
                ". ",
            );
            out.push(Section::new(id, headed(head, body)));
        }
    }
    out
}

fn medications(fragment: &Value) -> Vec<Section> {
    let mut out = Vec::new();
    let Some(conditions) = fragment["byCondition"].as_array() else {
        return out;
    };

    for condition in conditions {
        let name = field(condition, "condition");
        let Some(meds) = condition["medications"].as_array() else {
            continue;
        };
        for med in meds {
            let Some(drug) = field(med, "drug") else {
                continue;
            };
            let brand = field(med, "brand").unwrap_or_else(|| "Generic".into());
            let id = match &name {
                Some(cond) => format!("medication-{}-{}", slugify(cond), slugify(&drug)),
                None => format!("medication-{}", slugify(&drug)),
            };

            let mut head = format!("{drug} ({brand})");
            if let Some(cond) = &name {
                head.push_str(&format!(" for {cond}"));
            }
            let level = field(med, "safetyLevel")
                .or_else(|| field(med, "safety"))
                .map(|l| format!("{}.", l.trim_end_matches('.')));
            let body = join_present([level, field(med, "note")], " ");
            out.push(Section::new(id, headed(head, body)));
        }
    }
    out
}

fn labor(fragment: &Value) -> Vec<Section> {
    let mut out = Vec::new();

    let signs = &fragment["signsOfLabor"];
    let water = field(&signs["waterBreaking"], "description");
    let when = field(&signs["whenToCallProvider"], "rule511");
    if water.is_some() || when.is_some() {
        let body = join_present(
            [
                water.map(|w| format!("Water breaking ({w})")),
                Some("True labor contractions are regular and grow closer together".into()),
                labelled("Call provider when: ", when),
            ],
            ". ",
        );
        out.push(Section::new("labor-signs", headed("Signs of labor".into(), body)));
    }

    for (stage, info) in entries(&fragment["stagesOfLabor"]) {
        let name = field(info, "name");
        let body = join_present([field(info, "description"), field(info, "timing")], " ");
        if name.is_none() && body.is_none() {
            continue;
        }
        let head = format!("Labor {}", name.unwrap_or_else(|| stage.clone()));
        out.push(Section::new(format!("labor-{}", slugify(stage)), headed(head, body)));
    }

    if let Some(methods) = fragment["painManagement"]["commonAndSafe"].as_array() {
        for method in methods {
            let Some(name) = field(method, "method") else {
                continue;
            };
            let body = join_present(
                [
                    field(method, "reliefLevel"),
                    labelled("How it's given: ", field(method, "howGiven")),
                    labelled("Impact on baby: ", field(method, "impactOnBaby")),
                    labelled("Notes: ", field(method, "notes")),
                ],
                ". ",
            );
            out.push(Section::new(
                format!("pain-{}", slugify(&name)),
                headed(format!("Pain management - {name}"), body),
            ));
        }
    }

    out
}

fn hospital_bag(fragment: &Value) -> Vec<Section> {
    entries(&fragment["hospitalBag"])
        .filter(|(_, items)| items.is_array())
        .filter_map(|(category, items)| {
            let items = list(items)?;
            Some(Section::new(
                format!("hospital-{}", slugify(category)),
                format!("Hospital bag {category}: {items}"),
            ))
        })
        .collect()
}

fn baby_gear(fragment: &Value) -> Vec<Section> {
    entries(fragment)
        .filter_map(|(item, info)| {
            let body = join_present(
                [
                    labelled("Types - ", list(&info["types"])),
                    labelled("Safety features - ", list(&info["keySafety"])),
                    labelled("Avoid: ", list(&info["avoid"])),
                ],
                ". ",
            )?;
            Some(Section::new(format!("gear-{}", slugify(item)), format!("{item}: {body}")))
        })
        .collect()
}

fn common_questions(fragment: &Value) -> Vec<Section> {
    let Some(questions) = fragment.as_array() else {
        return vec![];
    };

    questions
        .iter()
        .enumerate()
        .filter_map(|(i, qa)| {
            let question = field(qa, "question")?;
            let answer = join_present([field(qa, "answer"), field(qa, "details")], " ")?;
            let slug: String = slugify(&question).chars().take(20).collect();
            Some(Section::new(
                format!("faq-{}-{}", i + 1, slug.trim_end_matches('-')),
                format!("Q: {question} A: {answer}"),
            ))
        })
        .collect()
}

fn exercise(fragment: &Value) -> Vec<Section> {
    let body = join_present(
        [
            labelled("Safe exercises - ", list(&fragment["safe"])),
            labelled("Avoid - ", list(&fragment["avoid"])),
            labelled("Modifications - ", list(&fragment["modifications"])),
        ],
        ". ",
    );

    body.map(|body| Section::new("exercise-guidelines", format!("Exercise during pregnancy: {body}")))
        .into_iter()
        .collect()
}

fn travel(fragment: &Value) -> Vec<Section> {
    entries(fragment)
        .filter_map(|(mode, guide)| {
            let recommendations = list(guide.get("recommendations")?)?;
            Some(Section::new(
                format!("travel-{}", slugify(mode)),
                format!("Travel by {mode}: {recommendations}"),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{SAMPLE_JSON, sample_document};
    use serde_json::json;

    fn doc(value: Value) -> KnowledgeDocument {
        KnowledgeDocument::from_value(value, "pregnancyKnowledgeGraph").unwrap()
    }

    fn content<'a>(sections: &'a [Section], id: &str) -> Option<&'a str> {
        sections.iter().find(|s| s.id == id).map(|s| s.content.as_str())
    }

    #[test]
    fn test_daily_nutrition_content() {
        let sections = flatten(&doc(json!({
            "nutritionalRequirements": {
                "dailyMacros": [
                    {"nutrient": "Folic Acid", "amount": "600", "unit": "mcg", "category": "vitamins"},
                    {"nutrient": "Iron", "amount": "27", "unit": "mg", "category": "minerals"}
                ]
            }
        })));
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].id, "nutrition-daily");
        assert_eq!(
            sections[0].content,
            "Daily nutritional requirements during pregnancy: Folic Acid: 600 mcg (vitamins), Iron: 27 mg (minerals)"
        );
    }

    #[test]
    fn test_medication_content() {
        let sections = flatten(&doc(json!({
            "medications": {"byCondition": [{
                "condition": "Pain",
                "medications": [
                    {"drug": "Ibuprofen", "brand": "Advil", "safetyLevel": "Avoid", "note": "Not recommended after 20 weeks."},
                    {"drug": "Acetaminophen", "safety": "safe"}
                ]
            }]}
        })));
        assert_eq!(
            content(&sections, "medication-pain-ibuprofen"),
            Some("Ibuprofen (Advil) for Pain: Avoid. Not recommended after 20 weeks.")
        );
        assert_eq!(
            content(&sections, "medication-pain-acetaminophen"),
            Some("Acetaminophen (Generic) for Pain: safe.")
        );
    }

    #[test]
    fn test_empty_document_produces_no_sections() {
        let report = flatten_report(&doc(json!({})));
        assert!(report.sections.is_empty());
        assert_eq!(report.topic_counts.len(), EXTRACTORS.len());
        assert!(report.topic_counts.values().all(|&n| n == 0));
    }

    #[test]
    fn test_missing_fields_never_render_placeholders() {
        let sections = flatten(&doc(json!({
            "nutritionalRequirements": {"dailyMacros": [{"nutrient": "Iron"}]},
            "pregnancyTimeline": {"weeks5to8": {"title": "Weeks 5-8"}},
            "symptomTroubleshooting": {"categories": [{"symptoms": [{"sign": "Swelling"}]}]}
        })));
        assert_eq!(
            content(&sections, "nutrition-daily"),
            Some("Daily nutritional requirements during pregnancy: Iron")
        );
        assert_eq!(content(&sections, "timeline-weeks5to8"), Some("Weeks 5-8"));
        assert_eq!(content(&sections, "symptom-swelling"), Some("Swelling"));
        for section in &sections {
            assert!(!section.content.contains("undefined"));
            assert!(!section.content.contains("null"));
            assert!(!section.content.is_empty());
        }
    }

    #[test]
    fn test_blank_records_are_skipped() {
        let sections = flatten(&doc(json!({
            "foodSafety": {"avoidFoods": []},
            "morningSicknessManagement": {"whatToEat": [" "]},
            "nutritionalRequirements": {"dailyMacros": [{"amount": "600"}]},
            "commonQuestions": [{"question": "Unanswered?"}],
            "babyGear": {"stroller": {}},
            "travelGuidelines": {"air": {"recommendations": []}}
        })));
        assert!(sections.is_empty(), "unexpected sections: {sections:?}");
    }

    #[test]
    fn test_wrong_shapes_are_tolerated() {
        let sections = flatten(&doc(json!({
            "medications": "none",
            "symptomTroubleshooting": {"categories": {"not": "a list"}},
            "commonQuestions": {"question": "?"},
            "exerciseGuidelines": {"safe": "Walking"}
        })));
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].content, "Exercise during pregnancy: Safe exercises - Walking");
    }

    #[test]
    fn test_post_term_week_has_own_id() {
        let sections = flatten(&doc(json!({
            "pregnancyTimeline": {
                "weeks37to40": {"title": "Full term", "trimester": "Third"},
                "weeks40plus": {"timeline": "Week 40 to 42", "whatToExpect": ["Non-stress tests"]}
            }
        })));
        assert_eq!(content(&sections, "timeline-weeks37to40"), Some("Full term (Third trimester)"));
        assert_eq!(
            content(&sections, "timeline-overdue"),
            Some("Post-term pregnancy (40+ weeks): Timeline - Week 40 to 42. What to expect - Non-stress tests")
        );
    }

    #[test]
    fn test_same_drug_under_two_conditions_gets_distinct_ids() {
        let report = flatten_report(&doc(json!({
            "medications": {"byCondition": [
                {"condition": "Pain", "medications": [{"drug": "Acetaminophen"}]},
                {"condition": "Fever", "medications": [{"drug": "Acetaminophen"}]}
            ]}
        })));
        assert!(report.duplicate_ids.is_empty());
        assert_eq!(report.sections.len(), 2);
    }

    #[test]
    fn test_repeated_record_is_reported() {
        let report = flatten_report(&doc(json!({
            "medications": {"byCondition": [
                {"condition": "Pain", "medications": [{"drug": "Ibuprofen"}, {"drug": "Ibuprofen"}]}
            ]}
        })));
        assert_eq!(report.duplicate_ids, vec!["medication-pain-ibuprofen"]);
    }

    #[test]
    fn test_faq_ids() {
        let sections = flatten(&doc(json!({
            "commonQuestions": [
                {"question": "Can I drink coffee while pregnant?", "answer": "Yes, in moderation."},
                {"question": "Can I drink coffee while pregnant?", "details": "Limit to 200 mg."}
            ]
        })));
        assert_eq!(sections[0].id, "faq-1-can-i-drink-coffee-w");
        assert_eq!(sections[1].id, "faq-2-can-i-drink-coffee-w");
        assert_eq!(
            sections[0].content,
            "Q: Can I drink coffee while pregnant? A: Yes, in moderation."
        );
    }

    #[test]
    fn test_sample_document_flattens_every_topic() {
        let report = flatten_report(&sample_document());
        assert!(report.duplicate_ids.is_empty());
        for (topic, count) in &report.topic_counts {
            assert!(*count > 0, "topic {topic} produced no sections");
        }
        let ids: Vec<&str> = report.sections.iter().map(|s| s.id.as_str()).collect();
        for expected in [
            "nutrition-daily",
            "nutrition-weight",
            "food-safety",
            "morning-sickness",
            "timeline-weeks1to4",
            "timeline-overdue",
            "symptom-bleeding-heavy-vaginal-bleeding",
            "medication-pain-ibuprofen",
            "labor-signs",
            "labor-stage1",
            "pain-epidural",
            "hospital-formom",
            "gear-carseat",
            "faq-1-can-i-drink-coffee-w",
            "exercise-guidelines",
            "travel-air",
        ] {
            assert!(ids.contains(&expected), "missing section {expected}");
        }
        // The string note under hospitalBag is not a packing list.
        assert!(!ids.contains(&"hospital-notes"));
    }

    #[test]
    fn test_flatten_is_deterministic() {
        let doc = sample_document();
        assert_eq!(flatten(&doc), flatten(&doc));
    }

    #[test]
    fn test_removing_a_topic_drops_only_its_sections() {
        let full_doc = sample_document();
        let full = flatten(&full_doc);
        let sample: Value = serde_json::from_str(SAMPLE_JSON).unwrap();

        for (topic, extract) in EXTRACTORS {
            let own = extract(full_doc.topic(topic).unwrap());
            assert!(!own.is_empty(), "{topic} yields nothing in the sample");

            let mut partial = sample.clone();
            partial["pregnancyKnowledgeGraph"]
                .as_object_mut()
                .unwrap()
                .remove(*topic);
            let remaining = flatten(&doc(partial));

            let expected: Vec<Section> = full
                .iter()
                .filter(|s| !own.iter().any(|o| o.id == s.id))
                .cloned()
                .collect();
            assert_eq!(remaining, expected, "removing {topic}");
            assert!(remaining.iter().all(|s| !s.content.trim().is_empty()));
        }
    }
}
