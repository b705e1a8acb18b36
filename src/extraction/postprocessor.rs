//! Entity annotations → workout entries.
//!
//! Exercise entities define the entries. Every other recognized entity is a
//! modifier attached to the exercise mention whose text midpoint is closest
//! to its own.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::models::WorkoutEntry;

pub mod entity {
    pub const EXERCISE: &str = "exercise:exercise";
    pub const ATTRIBUTE: &str = "exercise:attribute";
    pub const SETS: &str = "wit$number:implied_sets";
    pub const REPS: &str = "wit$number:implied_reps";
    pub const DURATION: &str = "wit$duration:duration";
    pub const DISTANCE: &str = "wit$distance:distance";
    pub const WEIGHT: &str = "wit$quantity:weight";
}

pub mod work_type {
    pub const REPETITIONS: &str = "repetitions";
    pub const DURATION: &str = "duration";
    pub const DISTANCE: &str = "distance";
}

/// Response body of the annotation service
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageAnnotations {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub entities: HashMap<String, Vec<EntityAnnotation>>,
}

/// One recognized span of the input text
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntityAnnotation {
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub start: usize,
    #[serde(default)]
    pub end: usize,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub unit: Option<String>,
}

impl EntityAnnotation {
    /// Overflow-free for any pair of offsets
    fn midpoint(&self) -> usize {
        self.start / 2 + self.end / 2 + (self.start % 2 + self.end % 2) / 2
    }

    fn amount(&self) -> Option<f64> {
        self.value.as_ref().and_then(parse_amount)
    }
}

/// Build ordered entries from an annotation response
pub fn entries_from_annotations(annotations: &MessageAnnotations) -> Vec<WorkoutEntry> {
    let mut exercises: Vec<&EntityAnnotation> = annotations
        .entities
        .get(entity::EXERCISE)
        .map(|mentions| mentions.iter().collect())
        .unwrap_or_default();
    exercises.sort_by_key(|mention| mention.start);

    let mut entries: Vec<WorkoutEntry> = Vec::new();
    // (entry index, mention midpoint) for every exercise mention
    let mut anchors: Vec<(usize, usize)> = Vec::new();

    for mention in exercises {
        let name = clean_text(&mention.body);
        if name.is_empty() {
            continue;
        }
        let index = match entries.iter().position(|entry| entry.name == name) {
            Some(index) => index,
            None => {
                entries.push(WorkoutEntry::named(name));
                entries.len() - 1
            }
        };
        anchors.push((index, mention.midpoint()));
    }

    if entries.is_empty() {
        return entries;
    }

    let modifiers = |key: &str| -> Vec<&EntityAnnotation> {
        annotations
            .entities
            .get(key)
            .map(|list| list.iter().collect())
            .unwrap_or_default()
    };

    for mention in modifiers(entity::SETS) {
        if let Some(sets) = mention.amount() {
            entries[closest_entry(&anchors, mention)].sets = Some(sets);
        }
    }

    for (key, kind) in [
        (entity::REPS, work_type::REPETITIONS),
        (entity::DURATION, work_type::DURATION),
        (entity::DISTANCE, work_type::DISTANCE),
    ] {
        for mention in modifiers(key) {
            if let Some(amount) = mention.amount() {
                let entry = &mut entries[closest_entry(&anchors, mention)];
                entry.work = Some(amount);
                entry.work_type = Some(kind.to_string());
            }
        }
    }

    for mention in modifiers(entity::WEIGHT) {
        if let Some(weight) = mention.amount() {
            let entry = &mut entries[closest_entry(&anchors, mention)];
            entry.resistance = Some(weight);
            entry.resistance_type = Some(resistance_unit(mention.unit.as_deref()).to_string());
        }
    }

    for mention in modifiers(entity::ATTRIBUTE) {
        let attribute = clean_text(&mention.body);
        if !attribute.is_empty() {
            entries[closest_entry(&anchors, mention)]
                .attributes
                .push(attribute);
        }
    }

    entries
}

/// Earliest anchor wins ties. `anchors` is never empty here.
fn closest_entry(anchors: &[(usize, usize)], mention: &EntityAnnotation) -> usize {
    let midpoint = mention.midpoint();
    anchors
        .iter()
        .min_by_key(|(_, anchor)| anchor.abs_diff(midpoint))
        .map(|(index, _)| *index)
        .unwrap_or(0)
}

fn resistance_unit(unit: Option<&str>) -> &'static str {
    match unit {
        Some("kilogram") => "kg",
        _ => "pounds",
    }
}

fn clean_text(text: &str) -> String {
    text.trim()
        .trim_matches(|c: char| ".,;:!?-".contains(c))
        .to_string()
}

/// Numbers, numeric strings, number words, or `{"value": n}` objects
pub fn parse_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .or_else(|| parse_number_words(text)),
        Value::Object(map) => map.get("value").and_then(|inner| match inner {
            Value::Number(number) => number.as_f64(),
            _ => None,
        }),
        _ => None,
    }
}

fn word_value(word: &str) -> Option<f64> {
    let value = match word {
        "one" => 1.0,
        "two" => 2.0,
        "three" => 3.0,
        "four" => 4.0,
        "five" => 5.0,
        "six" => 6.0,
        "seven" => 7.0,
        "eight" => 8.0,
        "nine" => 9.0,
        "ten" => 10.0,
        "eleven" => 11.0,
        "twelve" => 12.0,
        "thirteen" => 13.0,
        "fourteen" => 14.0,
        "fifteen" => 15.0,
        "sixteen" => 16.0,
        "seventeen" => 17.0,
        "eighteen" => 18.0,
        "nineteen" => 19.0,
        "twenty" => 20.0,
        "thirty" => 30.0,
        "forty" => 40.0,
        "fifty" => 50.0,
        "sixty" => 60.0,
        "seventy" => 70.0,
        "eighty" => 80.0,
        "ninety" => 90.0,
        _ => return None,
    };
    Some(value)
}

/// "five", "twenty-five", "one hundred twenty"
fn parse_number_words(text: &str) -> Option<f64> {
    let lowered = text.to_lowercase();
    let mut total = 0.0;
    let mut matched = false;

    for word in lowered.split(|c: char| c.is_whitespace() || c == '-') {
        if word == "hundred" {
            total = if matched { total * 100.0 } else { 100.0 };
            matched = true;
        } else if let Some(value) = word_value(word) {
            total += value;
            matched = true;
        }
    }

    matched.then_some(total)
}
