//! Module: axiom
//! Responsibility: extract the set of referenced SNOMED concept ids from an
//! OWL functional-syntax class-expression string (§4.3).
//! Does not own: any notion of whether a referenced concept is active —
//! that composition happens in `checker`.

use crate::ids::{ConceptId, IdSet};

const SNOMED_IRI_PREFIX: &str = "http://snomed.info/id/";
/// SNOMED concept identifiers are 6 to 18 decimal digits (partition +
/// check digit included); anything outside that range is not a concept
/// reference (e.g. a cardinality literal).
const MIN_ID_DIGITS: usize = 6;
const MAX_ID_DIGITS: usize = 18;

///
/// AxiomExpressionParser
///
/// Deterministic, pure, free functions — no state, no I/O. Given the same
/// expression string it always returns the same (unordered, deduplicated)
/// set of referenced concept ids.
///

pub struct AxiomExpressionParser;

impl AxiomExpressionParser {
    /// Extract every SNOMED concept id referenced anywhere in `expression`
    /// — header subject and body alike. Non-SNOMED references (datatypes,
    /// annotation IRIs, literal values) are excluded.
    ///
    /// # Errors
    /// Returns a conversion error if `expression` is empty or has
    /// unbalanced parentheses — the two structural faults a functional-
    /// syntax class expression can have that this parser can detect
    /// without a full grammar.
    pub fn referenced_concepts(expression: &str) -> Result<IdSet, String> {
        let trimmed = expression.trim();
        if trimmed.is_empty() {
            return Err("empty OWL expression".to_string());
        }
        check_balanced_parens(trimmed)?;

        let mut out = IdSet::new();
        for token in tokenize(trimmed) {
            if let Some(id) = concept_id_in_token(token) {
                out.insert(id);
            }
        }
        Ok(out)
    }
}

fn check_balanced_parens(expression: &str) -> Result<(), String> {
    let mut depth = 0i32;
    for c in expression.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err("unbalanced parentheses: unmatched ')'".to_string());
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err("unbalanced parentheses: unmatched '('".to_string());
    }
    Ok(())
}

/// Split on whitespace and the functional-syntax structural characters,
/// keeping quoted literals (and their `^^datatype` suffix) together so
/// they can be rejected as a single non-numeric token.
fn tokenize(expression: &str) -> impl Iterator<Item = &str> {
    expression
        .split(|c: char| c.is_whitespace() || c == '(' || c == ')' || c == ',')
        .filter(|s| !s.is_empty())
}

fn concept_id_in_token(token: &str) -> Option<ConceptId> {
    if let Some(rest) = token.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
        return snomed_id_from_iri(rest);
    }
    if let Some(local) = token.strip_prefix(':') {
        return digits_to_concept_id(local);
    }
    // Bare numeric literal, e.g. a subject id with no prefix.
    digits_to_concept_id(token)
}

fn snomed_id_from_iri(iri: &str) -> Option<ConceptId> {
    let local = iri.strip_prefix(SNOMED_IRI_PREFIX)?;
    digits_to_concept_id(local)
}

fn digits_to_concept_id(candidate: &str) -> Option<ConceptId> {
    if candidate.is_empty()
        || candidate.len() < MIN_ID_DIGITS
        || candidate.len() > MAX_ID_DIGITS
        || !candidate.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    candidate.parse::<u64>().ok().map(ConceptId)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_header_and_body_ids() {
        let expr = "SubClassOf(:73211009 ObjectIntersectionOf(:404684003 ObjectSomeValuesFrom(:363698007 :442083009)))";
        let ids = AxiomExpressionParser::referenced_concepts(expr).unwrap();
        assert!(ids.contains(ConceptId(73211009)));
        assert!(ids.contains(ConceptId(404684003)));
        assert!(ids.contains(ConceptId(363698007)));
        assert!(ids.contains(ConceptId(442083009)));
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn extracts_full_iri_form() {
        let expr = "SubClassOf(<http://snomed.info/id/73211009> <http://snomed.info/id/404684003>)";
        let ids = AxiomExpressionParser::referenced_concepts(expr).unwrap();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn excludes_datatype_and_annotation_iris_and_literals() {
        let expr = r#"DataHasValue(:1142135004 "2"^^<http://www.w3.org/2001/XMLSchema#integer>)"#;
        let ids = AxiomExpressionParser::referenced_concepts(expr).unwrap();
        assert_eq!(ids.len(), 1);
        assert!(ids.contains(ConceptId(1142135004)));
    }

    #[test]
    fn deduplicates_repeated_references() {
        let expr = "EquivalentClasses(:73211009 ObjectIntersectionOf(:73211009 :404684003))";
        let ids = AxiomExpressionParser::referenced_concepts(expr).unwrap();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn rejects_empty_expression() {
        assert!(AxiomExpressionParser::referenced_concepts("   ").is_err());
    }

    #[test]
    fn rejects_unbalanced_parentheses() {
        let expr = "SubClassOf(:73211009 ObjectIntersectionOf(:404684003)";
        assert!(AxiomExpressionParser::referenced_concepts(expr).is_err());
    }

    proptest::proptest! {
        /// Never panics on arbitrary input, and every extracted id falls
        /// within the digit-length bounds this parser enforces.
        #[test]
        fn never_panics_and_ids_stay_in_bounds(expr in "\\PC{0,200}") {
            if let Ok(ids) = AxiomExpressionParser::referenced_concepts(&expr) {
                for id in &ids {
                    let digits = id.0.to_string().len();
                    assert!((MIN_ID_DIGITS..=MAX_ID_DIGITS).contains(&digits));
                }
            }
        }

        /// A well-formed `SubClassOf(:subject :object)` shape always yields
        /// exactly the two curie-referenced ids, regardless of digit value
        /// within range.
        #[test]
        fn curie_pair_round_trips(subject in 100_000u64..999_999, object in 100_000u64..999_999) {
            let expr = format!("SubClassOf(:{subject} :{object})");
            let ids = AxiomExpressionParser::referenced_concepts(&expr).unwrap();
            assert!(ids.contains(ConceptId(subject)));
            assert!(ids.contains(ConceptId(object)));
        }
    }
}
