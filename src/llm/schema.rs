//! Response schemas for JSON-mode requests, in the OpenAPI subset the
//! generateContent endpoint accepts.

use serde_json::{ json, Value as JsonValue };

fn string_list() -> JsonValue {
    json!({ "type": "ARRAY", "items": { "type": "STRING" } })
}

pub fn report_analysis() -> JsonValue {
    json!({
        "type": "OBJECT",
        "properties": {
            "riskScore": { "type": "INTEGER" },
            "summary": { "type": "STRING" },
            "keyFindings": string_list(),
            "recommendations": string_list(),
            "vitalSigns": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "value": { "type": "STRING" },
                        "status": { "type": "STRING", "enum": ["Normal", "Warning", "Critical"] }
                    },
                    "required": ["name", "value", "status"]
                }
            }
        },
        "required": ["riskScore", "summary", "keyFindings", "recommendations", "vitalSigns"]
    })
}

pub fn risk_profile() -> JsonValue {
    json!({
        "type": "OBJECT",
        "properties": {
            "overallScore": { "type": "INTEGER" },
            "cardiovascular": { "type": "INTEGER" },
            "metabolic": { "type": "INTEGER" },
            "respiratory": { "type": "INTEGER" },
            "lifestyle": { "type": "INTEGER" },
            "summary": { "type": "STRING" }
        },
        "required": ["overallScore", "cardiovascular", "metabolic", "respiratory", "lifestyle", "summary"]
    })
}

pub fn health_metrics() -> JsonValue {
    json!({
        "type": "OBJECT",
        "properties": {
            "metrics": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "date": { "type": "STRING" },
                        "value": { "type": "NUMBER" },
                        "unit": { "type": "STRING" },
                        "type": { "type": "STRING" }
                    },
                    "required": ["date", "value", "unit", "type"]
                }
            }
        },
        "required": ["metrics"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required(schema: &JsonValue) -> Vec<&str> {
        schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect()
    }

    #[test]
    fn every_required_field_is_declared() {
        for schema in [report_analysis(), risk_profile(), health_metrics()] {
            for field in required(&schema) {
                assert!(schema["properties"].get(field).is_some(), "{} undeclared", field);
            }
        }
    }

    #[test]
    fn vital_status_is_an_enum() {
        let schema = report_analysis();
        let status = &schema["properties"]["vitalSigns"]["items"]["properties"]["status"];
        assert_eq!(status["enum"].as_array().unwrap().len(), 3);
    }
}
