use anyhow::{Context, Result};
use facility_planner::{config, optimizer, planner, postprocess, repo, telemetry};
use config::Config;
use optimizer::{FacilityOptimizer, MilpBackend, PlanningProblem, VariantKind};
use planner::{FailurePolicy, PeriodDemand, Planner};
use postprocess::{PlanReport, Submission};
use telemetry::init_tracing;
use tracing::{error, info, warn};

fn main() -> Result<()> {
    init_tracing();

    let cfg = Config::load().context("loading configuration")?;
    info!(
        variant = %cfg.model.variant,
        periods = ?cfg.planning.periods,
        "starting facility planner"
    );

    let facilities = repo::load_facilities(&cfg.data.facilities)
        .with_context(|| format!("loading facilities from {}", cfg.data.facilities.display()))?;
    let mut periods = Vec::with_capacity(cfg.planning.periods.len());
    for period in &cfg.planning.periods {
        let customers = repo::load_demand(&cfg.data.demand, period)
            .with_context(|| format!("loading demand for period {period}"))?;
        periods.push(PeriodDemand::new(period.clone(), customers));
    }

    let optimizer = FacilityOptimizer::new(Box::new(MilpBackend::new()), cfg.solver_settings());
    let out = &cfg.data.output_dir;

    let mut reports: Vec<(String, PlanReport)> = Vec::new();
    if cfg.model.variant == VariantKind::ChargerBuildOut {
        let run = Planner::new(optimizer, cfg.charger_spec())
            .with_shipping(cfg.shipping())
            .with_failure_policy(cfg.planning.on_failure)
            .run(facilities, periods);

        for plan in run.periods {
            match plan.outcome {
                Ok(report) => {
                    repo::save_facilities(
                        out.join(format!("existing_EV_infrastructure_{}.csv", plan.period)),
                        &plan.facilities,
                    )?;
                    reports.push((plan.period, report));
                }
                Err(e) => error!(period = %plan.period, error = %e, "no plan for period"),
            }
        }
    } else {
        // Independent solves; open/close decisions carry no state between periods
        for PeriodDemand { period, customers } in periods {
            let problem = PlanningProblem::new(facilities.clone(), customers, cfg.variant())
                .with_shipping(cfg.shipping());
            match optimizer.optimize(&problem) {
                Ok(report) => reports.push((period, report)),
                Err(e) => {
                    error!(period = %period, error = %e, "no plan for period");
                    if cfg.planning.on_failure == FailurePolicy::Abort {
                        break;
                    }
                }
            }
        }
    }

    let mut all_records = Vec::new();
    let mut summaries = Vec::new();
    for (period, report) in &reports {
        info!(period = %period, "\n{}", report.render(cfg.planning.report_sample));
        let records = report.to_records(period);
        repo::save_records(out.join(format!("result_{period}.csv")), &records)?;
        if cfg.planning.submits(period) {
            all_records.extend(records);
        }
        summaries.push(serde_json::json!({ "period": period, "summary": report.summary() }));
    }

    let submission = Submission::assemble(all_records);
    if !submission.is_clean() {
        warn!(anomalies = submission.anomalies.len(), "submission contains negative values");
    }
    repo::save_records(out.join("submission.csv"), &submission.records)?;

    let summary_path = out.join("summary.json");
    std::fs::write(&summary_path, serde_json::to_string_pretty(&summaries)?)
        .with_context(|| format!("writing {}", summary_path.display()))?;

    if reports.len() < cfg.planning.periods.len() {
        anyhow::bail!(
            "{} of {} periods produced no plan",
            cfg.planning.periods.len() - reports.len(),
            cfg.planning.periods.len()
        );
    }
    info!(periods = reports.len(), "planning complete");
    Ok(())
}
