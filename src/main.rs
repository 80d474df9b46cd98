//! Evaluates a chemistry setup once and prints the state and reaction tables.
//!
//! usage: `plasma_chem [setup.json] [electron_kinetics.json] [report.json]`
use log::{LevelFilter, error, info};
use plasma_chem::Chemistry::chem_errors::ChemistryError;
use plasma_chem::Chemistry::electron_kinetics::{ElectronKinetics, ElectronKineticsSnapshot};
use plasma_chem::Chemistry::report::{ChemistryReport, print_reactions, print_states};
use plasma_chem::Chemistry::setup::ChemistrySetup;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::env;
use std::process::ExitCode;

const DEFAULT_SETUP: &str = "demos/nitrogen.json";

fn run(setup_path: &str, eedf_path: Option<&str>, report_path: Option<&str>) -> Result<(), ChemistryError> {
    let setup = ChemistrySetup::from_file(setup_path)?;
    let mut chemistry = setup.build()?;
    let snapshot = eedf_path.map(ElectronKineticsSnapshot::from_file).transpose()?;
    let electron_kinetics = snapshot.as_ref().map(|s| s as &dyn ElectronKinetics);

    let wc = &setup.working_conditions;
    chemistry.evaluate_rate_coefficients(wc, electron_kinetics)?;
    chemistry.compute_net_rates(wc)?;

    print_states(&chemistry.graph);
    print_reactions(&chemistry.reactions);
    if let Some(path) = report_path {
        ChemistryReport::from_chemistry(&chemistry).save(path)?;
        info!("report written to {}", path);
    }
    Ok(())
}

pub fn main() -> ExitCode {
    let _ = TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );
    let args: Vec<String> = env::args().skip(1).collect();
    let setup_path = args.first().map(String::as_str).unwrap_or(DEFAULT_SETUP);
    match run(
        setup_path,
        args.get(1).map(String::as_str),
        args.get(2).map(String::as_str),
    ) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}: {}", setup_path, e);
            ExitCode::FAILURE
        }
    }
}
