//! The structured result of one diagnosis request.
//!
//! [`DiagnosticRecord`] is built from whatever JSON object the recovery
//! pipeline managed to parse. The model carries no hard schema guarantee,
//! so **every field is optional with a documented default**: construction
//! goes through [`DiagnosticRecord::from_value`], which coerces each field
//! independently and falls back to the default on a missing or ill-typed
//! value. Accessors never panic.
//!
//! The record also owns the fixed fallback shapes: the "Failed image"
//! record substituted when the model call or the parse fails, and the
//! "Empty image" record used when nothing was uploaded. Both mirror the
//! non-medical fallback the model itself is instructed to emit.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Sentinel `image_type` emitted by the model for non-medical uploads.
pub const NON_MEDICAL_IMAGE: &str = "Non-medical image";

/// Sentinel `image_type` of the record substituted when analysis failed.
pub const FAILED_IMAGE: &str = "Failed image";

/// Sentinel `image_type` of the record substituted for an empty submission.
pub const EMPTY_IMAGE: &str = "Empty image";

/// The fixed disclaimer carried by every record.
pub const IMPORTANT_NOTE: &str = "This information is intended for informational and educational \
purposes only and does not constitute medical advice. It is essential to consult with a qualified \
healthcare professional for any health concerns and should not be used as a substitute for a \
consultation with a healthcare provider.";

/// Patient data echoed back by the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientInformation {
    #[serde(default)]
    pub age: Option<f64>,
    #[serde(default)]
    pub symptoms: Option<String>,
    #[serde(default)]
    pub relevant_details: String,
}

/// What the model saw in the uploaded images.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    #[serde(default)]
    pub image_type: String,
    #[serde(default)]
    pub image_analysis: String,
}

/// One ranked entry of the differential diagnosis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DifferentialDiagnosis {
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub probability: f64,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub risk_factors: String,
}

/// A diagnosis the model considered and ruled out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlternativeDiagnosis {
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub reasoning_against: String,
}

/// A disclosed reasoning bias with a remediation suggestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BiasDisclosure {
    #[serde(default)]
    pub bias: String,
    #[serde(default)]
    pub recommendation: String,
}

/// The structured record of one diagnosis request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    #[serde(default)]
    pub patient_information: PatientInformation,
    #[serde(default)]
    pub image_analysis: ImageAnalysis,
    #[serde(default)]
    pub answer_to_question: BTreeMap<String, String>,
    #[serde(default)]
    pub differential_diagnosis: Vec<DifferentialDiagnosis>,
    #[serde(default)]
    pub alternative_diagnoses: Vec<AlternativeDiagnosis>,
    #[serde(default)]
    pub follow_up_recommendations: Vec<String>,
    #[serde(default)]
    pub biases: Vec<BiasDisclosure>,
    #[serde(default)]
    pub articles: Vec<String>,
    #[serde(default)]
    pub confidence_level: f64,
    #[serde(default)]
    pub important_note: String,
}

impl DiagnosticRecord {
    /// Build a record from a parsed JSON value, field by field.
    ///
    /// Each field is coerced independently: a missing key, a wrong-typed
    /// value, or a malformed list element falls back to its default (or is
    /// skipped, for list elements) without affecting any other field. This
    /// is the "no further schema validation" contract — the parse already
    /// succeeded, and whatever shape the model produced is taken as-is.
    pub fn from_value(value: &Value) -> Self {
        let obj = match value.as_object() {
            Some(map) => map,
            None => return Self::default(),
        };

        Self {
            patient_information: field(obj, "patient_information"),
            image_analysis: field(obj, "image_analysis"),
            answer_to_question: string_map(obj, "answer_to_question"),
            differential_diagnosis: lenient_seq(obj, "differential_diagnosis"),
            alternative_diagnoses: lenient_seq(obj, "alternative_diagnoses"),
            follow_up_recommendations: lenient_seq(obj, "follow_up_recommendations"),
            biases: lenient_seq(obj, "biases"),
            articles: lenient_seq(obj, "articles"),
            confidence_level: obj
                .get("confidence_level")
                .and_then(Value::as_f64)
                .unwrap_or_default(),
            important_note: field(obj, "important_note"),
        }
    }

    /// The primary diagnosis: the entry with the highest `probability`.
    ///
    /// Ties break to the **first** maximal entry — the model ranks its
    /// list, so earlier position wins between equal scores.
    pub fn primary_diagnosis(&self) -> Option<&DifferentialDiagnosis> {
        let mut best: Option<&DifferentialDiagnosis> = None;
        for entry in &self.differential_diagnosis {
            match best {
                Some(current) if entry.probability <= current.probability => {}
                _ => best = Some(entry),
            }
        }
        best
    }

    /// Whether the model judged the uploads non-medical.
    pub fn is_non_medical(&self) -> bool {
        self.image_analysis.image_type == NON_MEDICAL_IMAGE
    }

    /// The record substituted when the model call or the parse failed.
    pub fn failed() -> Self {
        Self::fallback(
            FAILED_IMAGE,
            "No details to display because analysis failed. Ensure the file is correct and valid.",
            "Image analysis failed. Ensure the file is correct and valid.",
        )
    }

    /// The record substituted when nothing usable was uploaded.
    pub fn empty_submission() -> Self {
        Self::fallback(
            EMPTY_IMAGE,
            "No details to display. Please upload files or a prompt.",
            "No image analysis to display. Please upload files or a prompt.",
        )
    }

    fn fallback(image_type: &str, relevant_details: &str, image_analysis: &str) -> Self {
        Self {
            patient_information: PatientInformation {
                age: None,
                symptoms: None,
                relevant_details: relevant_details.to_string(),
            },
            image_analysis: ImageAnalysis {
                image_type: image_type.to_string(),
                image_analysis: image_analysis.to_string(),
            },
            answer_to_question: BTreeMap::from([(
                "Answer".to_string(),
                "Not applicable.".to_string(),
            )]),
            differential_diagnosis: Vec::new(),
            alternative_diagnoses: Vec::new(),
            follow_up_recommendations: Vec::new(),
            biases: standing_biases(),
            articles: Vec::new(),
            confidence_level: 10.0,
            important_note: IMPORTANT_NOTE.to_string(),
        }
    }
}

/// The three standing bias disclosures carried by every fallback record.
fn standing_biases() -> Vec<BiasDisclosure> {
    vec![
        BiasDisclosure {
            bias: "Lack of patient-specific information limits diagnostic accuracy.".into(),
            recommendation: "Obtain a complete patient history, including age, symptoms, and \
                             relevant medical background."
                .into(),
        },
        BiasDisclosure {
            bias: "Absence of medical examination data hinders comprehensive assessment.".into(),
            recommendation: "Conduct a thorough physical examination and gather vital signs."
                .into(),
        },
        BiasDisclosure {
            bias: "Reliance on image data alone may lead to incomplete or inaccurate conclusions."
                .into(),
            recommendation: "Integrate image findings with other diagnostic modalities, such as \
                             laboratory tests and clinical assessments."
                .into(),
        },
    ]
}

/// Coerce one field, falling back to `T::default()` on absence or mismatch.
fn field<T: DeserializeOwned + Default>(obj: &serde_json::Map<String, Value>, key: &str) -> T {
    obj.get(key)
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

/// Coerce a list field element by element, skipping malformed entries.
fn lenient_seq<T: DeserializeOwned>(obj: &serde_json::Map<String, Value>, key: &str) -> Vec<T> {
    obj.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Coerce a question → answer object, stringifying non-string answers.
fn string_map(obj: &serde_json::Map<String, Value>, key: &str) -> BTreeMap<String, String> {
    obj.get(key)
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .map(|(question, answer)| {
                    let text = match answer {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (question.clone(), text)
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_value_with_full_record() {
        let value = json!({
            "patient_information": {"age": 52, "symptoms": "chest pain", "relevant_details": "smoker"},
            "image_analysis": {"image_type": "Chest X-ray", "image_analysis": "Opacity in left lower lobe."},
            "answer_to_question": {"Is this pneumonia?": "Likely, given the opacity."},
            "differential_diagnosis": [
                {"diagnosis": "Pneumonia", "probability": 70, "reasoning": "Opacity plus fever.",
                 "severity": "moderate", "risk_factors": "smoking"}
            ],
            "alternative_diagnoses": [
                {"diagnosis": "Pulmonary embolism", "reasoning_against": "No pleuritic pain."}
            ],
            "follow_up_recommendations": ["Sputum culture", "CBC"],
            "biases": [{"bias": "Single image only.", "recommendation": "Obtain lateral view."}],
            "articles": ["Mayo Clinic: Pneumonia overview"],
            "confidence_level": 72,
            "important_note": IMPORTANT_NOTE
        });

        let record = DiagnosticRecord::from_value(&value);
        assert_eq!(record.patient_information.age, Some(52.0));
        assert_eq!(record.image_analysis.image_type, "Chest X-ray");
        assert_eq!(record.differential_diagnosis.len(), 1);
        assert_eq!(record.differential_diagnosis[0].probability, 70.0);
        assert_eq!(record.confidence_level, 72.0);
        assert_eq!(
            record.answer_to_question.get("Is this pneumonia?").unwrap(),
            "Likely, given the opacity."
        );
    }

    #[test]
    fn missing_fields_resolve_to_defaults() {
        let record = DiagnosticRecord::from_value(&json!({}));
        assert_eq!(record.patient_information.age, None);
        assert!(record.differential_diagnosis.is_empty());
        assert!(record.articles.is_empty());
        assert_eq!(record.confidence_level, 0.0);
        assert!(record.important_note.is_empty());
    }

    #[test]
    fn ill_typed_fields_fall_back_without_affecting_others() {
        let value = json!({
            "patient_information": "not an object",
            "confidence_level": "eighty",
            "articles": ["valid", 42, "also valid"],
            "differential_diagnosis": [
                {"diagnosis": "Valid", "probability": 55},
                "malformed entry",
                {"diagnosis": "Also valid", "probability": 30}
            ]
        });

        let record = DiagnosticRecord::from_value(&value);
        assert_eq!(record.patient_information, PatientInformation::default());
        assert_eq!(record.confidence_level, 0.0);
        // String-typed elements survive; the integer is skipped.
        assert_eq!(record.articles, vec!["valid", "also valid"]);
        assert_eq!(record.differential_diagnosis.len(), 2);
        assert_eq!(record.differential_diagnosis[0].diagnosis, "Valid");
    }

    #[test]
    fn non_object_value_yields_default_record() {
        let record = DiagnosticRecord::from_value(&json!([1, 2, 3]));
        assert_eq!(record, DiagnosticRecord::default());
    }

    #[test]
    fn primary_diagnosis_picks_first_maximal_entry() {
        let value = json!({
            "differential_diagnosis": [
                {"diagnosis": "A", "probability": 60},
                {"diagnosis": "B", "probability": 85},
                {"diagnosis": "C", "probability": 85}
            ]
        });
        let record = DiagnosticRecord::from_value(&value);
        let primary = record.primary_diagnosis().expect("has entries");
        assert_eq!(primary.diagnosis, "B");
        assert_eq!(primary.probability, 85.0);
    }

    #[test]
    fn primary_diagnosis_of_empty_list_is_none() {
        assert!(DiagnosticRecord::default().primary_diagnosis().is_none());
    }

    #[test]
    fn non_string_answers_are_stringified() {
        let value = json!({"answer_to_question": {"Answer": 42}});
        let record = DiagnosticRecord::from_value(&value);
        assert_eq!(record.answer_to_question.get("Answer").unwrap(), "42");
    }

    #[test]
    fn failed_record_shape() {
        let record = DiagnosticRecord::failed();
        assert_eq!(record.image_analysis.image_type, FAILED_IMAGE);
        assert!(record.differential_diagnosis.is_empty());
        assert!(record.alternative_diagnoses.is_empty());
        assert!(record.follow_up_recommendations.is_empty());
        assert!(record.articles.is_empty());
        assert_eq!(record.biases.len(), 3);
        assert_eq!(record.confidence_level, 10.0);
        assert_eq!(record.important_note, IMPORTANT_NOTE);
        assert!(!record.is_non_medical());
    }

    #[test]
    fn empty_submission_record_shape() {
        let record = DiagnosticRecord::empty_submission();
        assert_eq!(record.image_analysis.image_type, EMPTY_IMAGE);
        assert_eq!(record.confidence_level, 10.0);
        assert_eq!(
            record.answer_to_question.get("Answer").unwrap(),
            "Not applicable."
        );
    }

    #[test]
    fn non_medical_sentinel_detection() {
        let value = json!({"image_analysis": {"image_type": "Non-medical image", "image_analysis": "A cat."}});
        assert!(DiagnosticRecord::from_value(&value).is_non_medical());
    }
}
