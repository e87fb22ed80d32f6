//! Renders the pass-1/pass-2/chi-square/winner sections to stdout, in the
//! fixed order specified for this tool, as text or (optionally) JSON.

use crate::chisquare::ChiSquareReport;
use crate::config::RunConfig;
use crate::farmer::Pass1Result;
use crate::interval::IntervalModel;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Pass1Summary {
    pub min: f64,
    pub max: f64,
    pub valid_count: u64,
    pub has_negative: bool,
    pub has_non_integer: bool,
}

impl From<&Pass1Result> for Pass1Summary {
    fn from(r: &Pass1Result) -> Self {
        Pass1Summary {
            min: r.min,
            max: r.max,
            valid_count: r.count,
            has_negative: r.has_negative,
            has_non_integer: r.has_non_integer,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Pass2Summary {
    pub bin_count: usize,
    pub bin_size: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub first_lower_bound: f64,
    pub last_upper_bound: f64,
    pub counts: Vec<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DistributionArrays {
    pub name: &'static str,
    pub probability: Vec<f64>,
    pub expected_frequency: Vec<f64>,
    pub chi_square_term: Vec<f64>,
    pub criterion: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub targets: Vec<String>,
    pub pass1: Pass1Summary,
    pub pass2: Pass2Summary,
    pub distributions: Vec<DistributionArrays>,
    pub winner: &'static str,
    pub winner_criterion: f64,
}

impl Report {
    pub fn build(
        config: &RunConfig,
        pass1: &Pass1Result,
        model_before_merge: &IntervalModel,
        merged_model: &IntervalModel,
        mean: f64,
        std_dev: f64,
        chi: &ChiSquareReport,
    ) -> Self {
        let targets = if !config.accelerator_devices.is_empty() {
            config.accelerator_devices.clone()
        } else {
            vec!["(cpu pool)".to_string()]
        };

        let pass2 = Pass2Summary {
            bin_count: merged_model.counter.len(),
            bin_size: model_before_merge.bin_size(),
            mean,
            std_dev,
            first_lower_bound: *merged_model.lower.first().unwrap_or(&0.0),
            last_upper_bound: *merged_model.upper.last().unwrap_or(&0.0),
            counts: merged_model.counter.clone(),
        };

        let distributions = chi
            .evaluations
            .iter()
            .map(|e| DistributionArrays {
                name: e.kind.name(),
                probability: e.probability.clone(),
                expected_frequency: e.expected_frequency.clone(),
                chi_square_term: e.chi_square_term.clone(),
                criterion: e.criterion,
            })
            .collect();

        let winner = chi.winner();

        Report {
            targets,
            pass1: pass1.into(),
            pass2,
            distributions,
            winner: winner.kind.name(),
            winner_criterion: winner.criterion,
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("targets: {}\n", self.targets.join(", ")));
        out.push_str("\n-- pass 1 --\n");
        out.push_str(&format!("min              : {}\n", self.pass1.min));
        out.push_str(&format!("max              : {}\n", self.pass1.max));
        out.push_str(&format!("valid count      : {}\n", self.pass1.valid_count));
        out.push_str(&format!("has negative     : {}\n", self.pass1.has_negative));
        out.push_str(&format!("has non-integer  : {}\n", self.pass1.has_non_integer));

        out.push_str("\n-- pass 2 --\n");
        out.push_str(&format!("bin count        : {}\n", self.pass2.bin_count));
        out.push_str(&format!("bin size         : {}\n", self.pass2.bin_size));
        out.push_str(&format!("mean             : {}\n", self.pass2.mean));
        out.push_str(&format!("std dev          : {}\n", self.pass2.std_dev));
        out.push_str(&format!(
            "first/last bound : [{}, {}]\n",
            self.pass2.first_lower_bound, self.pass2.last_upper_bound
        ));
        out.push_str(&format!("counts (post-merge): {:?}\n", self.pass2.counts));

        out.push_str("\n-- chi-square --\n");
        for d in &self.distributions {
            out.push_str(&format!("[{}]\n", d.name));
            out.push_str(&format!("  probability        : {:?}\n", d.probability));
            out.push_str(&format!("  expected frequency : {:?}\n", d.expected_frequency));
            out.push_str(&format!("  chi-square terms   : {:?}\n", d.chi_square_term));
            out.push_str(&format!("  criterion          : {}\n", d.criterion));
        }

        out.push_str(&format!(
            "\nwinner: {} (criterion = {})\n",
            self.winner, self.winner_criterion
        ));
        out
    }

    pub fn render_json(&self) -> crate::error::Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            crate::error::SolverError::NumericDegeneracy(format!("failed to render JSON report: {e}"))
        })
    }
}
