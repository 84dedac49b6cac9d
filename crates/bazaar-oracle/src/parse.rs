//! Turn raw oracle text into a validated [`NegotiationOutcome`].
//!
//! LLMs rarely return clean JSON. Extraction tries, in order:
//! 1. Direct JSON parse
//! 2. JSON inside a markdown code block
//! 3. Trailing commas stripped
//! 4. Code block contents with trailing commas stripped
//!
//! The resulting object is then checked field by field. Keys may be
//! `snake_case` or `camelCase`. Anything that fails validation is an error:
//! nothing is silently clamped, because the caller has a fallback.

use serde_json::{Map, Value};

use bazaar_types::{MAX_RELATIONSHIP_CHANGE, NegotiationOutcome};

use crate::error::ValidationError;

/// Longest dialogue kept, in characters.
pub const MAX_DIALOGUE_CHARS: usize = 600;

/// Parse and validate an oracle response.
///
/// # Errors
///
/// Returns [`ValidationError`] describing the first problem found.
pub fn parse_outcome(raw: &str) -> Result<NegotiationOutcome, ValidationError> {
    let object = extract_object(raw).ok_or(ValidationError::NotJson)?;
    validate(&object)
}

/// Run the recovery strategies until one yields a JSON object.
fn extract_object(raw: &str) -> Option<Map<String, Value>> {
    let trimmed = raw.trim();
    let as_object = |text: &str| match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    };

    as_object(trimmed)
        .or_else(|| extract_json_from_codeblock(trimmed).and_then(as_object))
        .or_else(|| as_object(&strip_trailing_commas(trimmed)))
        .or_else(|| {
            extract_json_from_codeblock(trimmed)
                .map(strip_trailing_commas)
                .and_then(|cleaned| as_object(&cleaned))
        })
}

fn validate(object: &Map<String, Value>) -> Result<NegotiationOutcome, ValidationError> {
    let accepted = field(object, "accepted", "accepted")
        .ok_or(ValidationError::MissingField("accepted"))?
        .as_bool()
        .ok_or(ValidationError::WrongType {
            field: "accepted",
            expected: "a boolean",
        })?;

    let dialogue = field(object, "dialogue", "dialogue")
        .ok_or(ValidationError::MissingField("dialogue"))?
        .as_str()
        .ok_or(ValidationError::WrongType {
            field: "dialogue",
            expected: "a string",
        })?
        .trim();
    if dialogue.is_empty() {
        return Err(ValidationError::EmptyDialogue);
    }
    let dialogue: String = dialogue.chars().take(MAX_DIALOGUE_CHARS).collect();

    let counter_offer = match field(object, "counter_offer", "counterOffer") {
        None | Some(Value::Null) => None,
        Some(value) => Some(counter_offer(value)?),
    };

    let change = field(object, "relationship_change", "relationshipChange")
        .ok_or(ValidationError::MissingField("relationship_change"))?;
    let change = whole_number(change).ok_or(ValidationError::WrongType {
        field: "relationship_change",
        expected: "an integer",
    })?;
    let bound = i64::from(MAX_RELATIONSHIP_CHANGE);
    if !(-bound..=bound).contains(&change) {
        return Err(ValidationError::RelationshipChangeOutOfRange(change));
    }
    let relationship_change = i32::try_from(change)
        .ok()
        .ok_or(ValidationError::RelationshipChangeOutOfRange(change))?;

    Ok(NegotiationOutcome {
        accepted,
        dialogue,
        counter_offer,
        relationship_change,
    })
}

/// Look a field up under its snake-case or camel-case name.
fn field<'a>(object: &'a Map<String, Value>, snake: &str, camel: &str) -> Option<&'a Value> {
    object.get(snake).or_else(|| object.get(camel))
}

/// Counter-offers may arrive as integers, floats, or numeric strings.
/// Floats are rounded; the result must be a positive `u32`.
fn counter_offer(value: &Value) -> Result<u32, ValidationError> {
    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or(ValidationError::WrongType {
        field: "counter_offer",
        expected: "a number or null",
    })?;

    let rounded = amount.round();
    if !(1.0..=f64::from(u32::MAX)).contains(&rounded) {
        return Err(ValidationError::CounterOfferOutOfRange(amount.to_string()));
    }
    // Range checked above.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(rounded as u32)
}

/// An integer, or a float with no fractional part.
fn whole_number(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    // Only small magnitudes are meaningful here; anything else is out of
    // range either way.
    if f.fract().abs() > f64::EPSILON || f.abs() > 1_000.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    Some(f as i64)
}

/// Extract the contents of the first markdown code block.
fn extract_json_from_codeblock(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_fence = text.get(open.checked_add(3)?..)?;
    // Skip the language tag line, if any.
    let body_start = after_fence.find('\n').and_then(|nl| nl.checked_add(1)).unwrap_or(0);
    let body = after_fence.get(body_start..)?;
    let end = body.find("```")?;
    body.get(..end).map(str::trim)
}

/// Strip trailing commas before closing braces and brackets.
fn strip_trailing_commas(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == ',' {
            let rest = chars.clone().find(|next| !next.is_whitespace());
            if matches!(rest, Some('}' | ']')) {
                continue;
            }
        }
        result.push(c);
    }
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_clean_json() {
        let outcome = parse_outcome(
            r#"{"accepted":false,"dialogue":"Steep.","counter_offer":34,"relationship_change":-1}"#,
        )
        .unwrap();
        assert!(!outcome.accepted);
        assert_eq!(outcome.dialogue, "Steep.");
        assert_eq!(outcome.counter_offer, Some(34));
        assert_eq!(outcome.relationship_change, -1);
    }

    #[test]
    fn parse_camel_case() {
        let outcome = parse_outcome(
            r#"{"accepted":true,"dialogue":"Deal!","counterOffer":null,"relationshipChange":3}"#,
        )
        .unwrap();
        assert!(outcome.accepted);
        assert_eq!(outcome.counter_offer, None);
        assert_eq!(outcome.relationship_change, 3);
    }

    #[test]
    fn parse_from_codeblock() {
        let raw = concat!(
            "Sure, here you go:\n```json\n",
            r#"{"accepted": true, "dialogue": "Fine.", "relationship_change": 1}"#,
            "\n```"
        );
        assert!(parse_outcome(raw).unwrap().accepted);
    }

    #[test]
    fn parse_trailing_comma_in_codeblock() {
        let raw = concat!(
            "```\n",
            r#"{"accepted": true, "dialogue": "Fine.", "relationship_change": 1,}"#,
            "\n```"
        );
        assert!(parse_outcome(raw).is_ok());
    }

    #[test]
    fn parse_trailing_comma() {
        let raw = r#"{"accepted": true, "dialogue": "Fine.", "relationship_change": 1, }"#;
        assert!(parse_outcome(raw).is_ok());
    }

    #[test]
    fn float_counter_offer_is_rounded() {
        let raw =
            r#"{"accepted":false,"dialogue":"No.","counter_offer":33.6,"relationship_change":0}"#;
        assert_eq!(parse_outcome(raw).unwrap().counter_offer, Some(34));
    }

    #[test]
    fn string_counter_offer_is_accepted() {
        let raw =
            r#"{"accepted":false,"dialogue":"No.","counterOffer":" 40 ","relationship_change":0}"#;
        assert_eq!(parse_outcome(raw).unwrap().counter_offer, Some(40));
    }

    #[test]
    fn garbage_is_not_json() {
        assert_eq!(parse_outcome("I think I'll take it."), Err(ValidationError::NotJson));
        assert_eq!(parse_outcome(""), Err(ValidationError::NotJson));
        assert_eq!(parse_outcome("[1, 2]"), Err(ValidationError::NotJson));
    }

    #[test]
    fn missing_accepted() {
        let raw = r#"{"dialogue": "Hm.", "relationship_change": 0}"#;
        assert_eq!(parse_outcome(raw), Err(ValidationError::MissingField("accepted")));
    }

    #[test]
    fn accepted_must_be_bool() {
        let raw = r#"{"accepted": "yes", "dialogue": "Hm.", "relationship_change": 0}"#;
        assert!(matches!(
            parse_outcome(raw),
            Err(ValidationError::WrongType { field: "accepted", .. })
        ));
    }

    #[test]
    fn blank_dialogue_rejected() {
        let raw = r#"{"accepted": true, "dialogue": "   ", "relationship_change": 0}"#;
        assert_eq!(parse_outcome(raw), Err(ValidationError::EmptyDialogue));
    }

    #[test]
    fn long_dialogue_truncated() {
        let long = "a".repeat(2_000);
        let raw = format!(r#"{{"accepted":true,"dialogue":"{long}","relationship_change":0}}"#);
        assert_eq!(parse_outcome(&raw).unwrap().dialogue.chars().count(), MAX_DIALOGUE_CHARS);
    }

    #[test]
    fn non_positive_counter_offer_rejected() {
        const BAD_OFFER: &str =
            r#"{"accepted":false,"dialogue":"No.","counter_offer":$,"relationship_change":0}"#;
        for bad in ["0", "-5", "0.4"] {
            let raw = BAD_OFFER.replace('$', bad);
            assert!(
                matches!(parse_outcome(&raw), Err(ValidationError::CounterOfferOutOfRange(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn relationship_change_out_of_range() {
        let raw = r#"{"accepted": true, "dialogue": "Yes!", "relationship_change": 9}"#;
        assert_eq!(
            parse_outcome(raw),
            Err(ValidationError::RelationshipChangeOutOfRange(9))
        );
    }

    #[test]
    fn relationship_change_must_be_whole() {
        let raw = r#"{"accepted": true, "dialogue": "Yes!", "relationship_change": 1.5}"#;
        assert!(matches!(parse_outcome(raw), Err(ValidationError::WrongType { .. })));

        let raw = r#"{"accepted": true, "dialogue": "Yes!", "relationship_change": 2.0}"#;
        assert_eq!(parse_outcome(raw).unwrap().relationship_change, 2);
    }

    #[test]
    fn missing_relationship_change() {
        let raw = r#"{"accepted": true, "dialogue": "Yes!"}"#;
        assert_eq!(
            parse_outcome(raw),
            Err(ValidationError::MissingField("relationship_change"))
        );
    }

    #[test]
    fn strip_trailing_commas_basic() {
        assert_eq!(strip_trailing_commas(r#"{"a": [1, 2, ], }"#), r#"{"a": [1, 2 ] }"#);
    }
}
