use serde::{Deserialize, Serialize};

// --- Source records ---

/// One CRM measure record as received in a query batch. Echoed verbatim
/// inside every queued lookup request so the worker needs no other context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureRecord {
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "Measure_Name_New__c", default)]
    pub measure_name: String,
    #[serde(rename = "Record_Type_Name__c", default)]
    pub record_type_name: String,
    #[serde(rename = "Record_Type_Id__c", default)]
    pub record_type_id: String,
    #[serde(rename = "Program__r", default)]
    pub program: ProgramRef,
}

/// Relationship stub carrying the program a measure belongs to. The name
/// keys the output aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramRef {
    #[serde(rename = "Name", default)]
    pub name: String,
}

// --- Classification ---

/// The two pipeline categories. A record whose measure name contains
/// "Recommendation" is a recommendation measure; everything else is a
/// direct-install measure, so classification is total and exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordCategory {
    #[serde(rename = "Recommendation")]
    Recommendation,
    #[serde(rename = "Direct Install")]
    DirectInstall,
}

impl RecordCategory {
    pub fn of(record: &MeasureRecord) -> Self {
        if record.measure_name.contains("Recommendation") {
            Self::Recommendation
        } else {
            Self::DirectInstall
        }
    }

    /// The picklist field interrogated on the record type for this category.
    pub fn lookup_field(self) -> &'static str {
        match self {
            Self::Recommendation => "Recommendation__c",
            Self::DirectInstall => "Equipment_Type__c",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Recommendation => "Recommendation",
            Self::DirectInstall => "Direct Install",
        }
    }
}

// --- Queue message ---

/// A queued picklist lookup. Serialized onto the broker by the fan-out and
/// decoded by the worker; carries the full HTTP request plus the
/// originating record, so producer and consumer share no state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupRequest {
    #[serde(rename = "Method")]
    pub method: String,
    #[serde(rename = "Url")]
    pub url: String,
    #[serde(rename = "Body")]
    pub body: Option<Vec<u8>>,
    #[serde(rename = "AccessToken")]
    pub access_token: String,
    #[serde(rename = "record")]
    pub record: MeasureRecord,
    #[serde(rename = "recordType")]
    pub record_type: RecordCategory,
}

// --- Lookup response ---

/// Shape of the picklist-values metadata endpoint response. Only the value
/// strings are consumed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PicklistQueryResponse {
    #[serde(rename = "Values", default)]
    pub values: Vec<PicklistValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PicklistValue {
    #[serde(rename = "value", default)]
    pub value: String,
}

// --- Enriched output records ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentRecord {
    #[serde(rename = "Program_Name__c")]
    pub program_name: String,
    #[serde(rename = "Measure_Description__c")]
    pub measure_description: String,
    #[serde(rename = "Equipment_Type__c")]
    pub equipment_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationRecord {
    #[serde(rename = "Program_Name__c")]
    pub program_name: String,
    #[serde(rename = "Measure_Description__c")]
    pub measure_description: String,
    #[serde(rename = "Recommendation__c")]
    pub recommendation: String,
}

/// One enriched output record. The variant carries the category, so merge
/// and reshape dispatch on the type rather than re-reading a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichedRecord {
    Equipment(EquipmentRecord),
    Recommendation(RecommendationRecord),
}

impl EnrichedRecord {
    /// Build the category-appropriate record from one looked-up picklist
    /// value and the context echoed through the queue.
    pub fn from_value(
        category: RecordCategory,
        program_name: &str,
        measure_description: &str,
        value: String,
    ) -> Self {
        match category {
            RecordCategory::DirectInstall => Self::Equipment(EquipmentRecord {
                program_name: program_name.to_string(),
                measure_description: measure_description.to_string(),
                equipment_type: value,
            }),
            RecordCategory::Recommendation => Self::Recommendation(RecommendationRecord {
                program_name: program_name.to_string(),
                measure_description: measure_description.to_string(),
                recommendation: value,
            }),
        }
    }
}

// --- Group state ---

/// Persisted per-program aggregate. Lists grow monotonically; empty lists
/// are omitted from the file and default to empty on parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramPicks {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub equipment_records: Vec<EquipmentRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendation_records: Vec<RecommendationRecord>,
}

impl ProgramPicks {
    pub fn push(&mut self, record: EnrichedRecord) {
        match record {
            EnrichedRecord::Equipment(r) => self.equipment_records.push(r),
            EnrichedRecord::Recommendation(r) => self.recommendation_records.push(r),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.equipment_records.is_empty() && self.recommendation_records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measure(name: &str) -> MeasureRecord {
        MeasureRecord {
            id: "a0X000000000001".to_string(),
            measure_name: name.to_string(),
            record_type_name: "Measure".to_string(),
            record_type_id: "012000000000AAA".to_string(),
            program: ProgramRef {
                name: "Residential Rebates".to_string(),
            },
        }
    }

    #[test]
    fn classification_matches_substring_anywhere_in_name() {
        assert_eq!(
            RecordCategory::of(&measure("HVAC Recommendation")),
            RecordCategory::Recommendation
        );
        assert_eq!(
            RecordCategory::of(&measure("Recommendation: Attic Insulation")),
            RecordCategory::Recommendation
        );
        assert_eq!(
            RecordCategory::of(&measure("Duct Sealing")),
            RecordCategory::DirectInstall
        );
        assert_eq!(
            RecordCategory::of(&measure("")),
            RecordCategory::DirectInstall
        );
    }

    #[test]
    fn category_labels_round_trip_through_json() {
        let json = serde_json::to_string(&RecordCategory::DirectInstall).unwrap();
        assert_eq!(json, "\"Direct Install\"");
        let back: RecordCategory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RecordCategory::DirectInstall);

        let json = serde_json::to_string(&RecordCategory::Recommendation).unwrap();
        assert_eq!(json, "\"Recommendation\"");
    }

    #[test]
    fn unknown_category_label_fails_to_decode() {
        let result: Result<RecordCategory, _> = serde_json::from_str("\"Retrofit\"");
        assert!(result.is_err());
    }

    #[test]
    fn lookup_request_uses_wire_field_names() {
        let request = LookupRequest {
            method: "GET".to_string(),
            url: "https://example.my.salesforce.com/services/data/v58.0/ui-api/object-info/Custom_Measure__c/picklist-values/012000000000AAA/Equipment_Type__c".to_string(),
            body: None,
            access_token: "00D-token".to_string(),
            record: measure("Duct Sealing"),
            record_type: RecordCategory::DirectInstall,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["Method"], "GET");
        assert!(value["Url"].as_str().unwrap().contains("picklist-values"));
        assert_eq!(value["Body"], serde_json::Value::Null);
        assert_eq!(value["AccessToken"], "00D-token");
        assert_eq!(value["record"]["Id"], "a0X000000000001");
        assert_eq!(value["record"]["Measure_Name_New__c"], "Duct Sealing");
        assert_eq!(value["record"]["Program__r"]["Name"], "Residential Rebates");
        assert_eq!(value["recordType"], "Direct Install");

        let back: LookupRequest = serde_json::from_value(value).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn picklist_response_parses_value_list() {
        let raw = r#"{"Values":[{"value":"Heat Pump"},{"value":"Smart Thermostat"}]}"#;
        let parsed: PicklistQueryResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.values.len(), 2);
        assert_eq!(parsed.values[0].value, "Heat Pump");
    }

    #[test]
    fn enriched_record_variant_follows_category() {
        let equipment = EnrichedRecord::from_value(
            RecordCategory::DirectInstall,
            "Alpha",
            "Duct Sealing",
            "Mastic".to_string(),
        );
        match equipment {
            EnrichedRecord::Equipment(r) => {
                assert_eq!(r.program_name, "Alpha");
                assert_eq!(r.equipment_type, "Mastic");
            }
            EnrichedRecord::Recommendation(_) => panic!("direct install must map to equipment"),
        }

        let recommendation = EnrichedRecord::from_value(
            RecordCategory::Recommendation,
            "Alpha",
            "HVAC Recommendation",
            "Upgrade filter".to_string(),
        );
        assert!(matches!(recommendation, EnrichedRecord::Recommendation(_)));
    }

    #[test]
    fn program_picks_omits_empty_lists_and_defaults_on_parse() {
        let mut picks = ProgramPicks::default();
        picks.push(EnrichedRecord::from_value(
            RecordCategory::Recommendation,
            "Alpha",
            "HVAC Recommendation",
            "Seal ducts".to_string(),
        ));

        let value = serde_json::to_value(&picks).unwrap();
        assert!(value.get("equipment_records").is_none());
        assert_eq!(value["recommendation_records"][0]["Recommendation__c"], "Seal ducts");
        assert_eq!(
            value["recommendation_records"][0]["Measure_Description__c"],
            "HVAC Recommendation"
        );

        let back: ProgramPicks = serde_json::from_value(value).unwrap();
        assert!(back.equipment_records.is_empty());
        assert_eq!(back.recommendation_records.len(), 1);
    }
}
