use serde::{Deserialize, Serialize};

/// Operating conditions for one gasification run.  Missing JSON fields fall
/// back to the reference run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionRequest {
    pub time: i64,
    pub t_in: i64,
    pub t_pr: i64,
    pub agent_type: String,
    pub q_agent: f64,
    pub sample_type: String,
    pub catalyst_type: String,
    pub catalyst_rate: f64,
}

impl Default for PredictionRequest {
    fn default() -> Self {
        Self {
            time: 29,
            t_in: 500,
            t_pr: 1000,
            agent_type: "Oxygen".to_string(),
            q_agent: 0.015,
            sample_type: "TWTS".to_string(),
            catalyst_type: "Marble dust".to_string(),
            catalyst_rate: 10.0,
        }
    }
}

/// Predicted syngas composition (%) and calorific value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(rename = "CO_perc")]
    pub co_perc: f64,
    #[serde(rename = "CO2_perc")]
    pub co2_perc: f64,
    #[serde(rename = "CH4_perc")]
    pub ch4_perc: f64,
    #[serde(rename = "O2_perc")]
    pub o2_perc: f64,
    #[serde(rename = "H2_perc")]
    pub h2_perc: f64,
    pub calorific_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub status: String,
    pub message: String,
    pub data: Prediction,
}
