//! Demo driver: solves one augmented system with the multi-process engine,
//! then cross-checks the answer against the sequential engine and reports
//! both wall times and the largest element-wise delta.
use log::{info, warn};
use pargauss::matrix::Matrix;
use pargauss::solver::parallel::solve_parallel;
use pargauss::solver::sequential::solve_sequential;
use simplelog::{ColorChoice, CombinedLogger, Config, LevelFilter, TermLogger, TerminalMode};
use std::env;
use std::process::ExitCode;
use std::time::Instant;

const TOLERANCE: f64 = 1e-6;

fn print_usage(prog: &str) {
    eprintln!(
        "usage: {} <mode> [order] [workers]\n  \
         mode = p -> predefined 3x4 system with known solution\n  \
         mode = r -> random diagonally dominant system of the given order\n  \
         workers  -> optional worker cap, 0 or absent = one per CPU",
        prog
    );
}

fn predefined_system() -> (Matrix, Vec<f64>) {
    let m = Matrix::new(
        3,
        4,
        vec![
            2.0, 1.0, -1.0, 8.0, //
            -3.0, -1.0, 2.0, -11.0, //
            -2.0, 1.0, 2.0, -3.0,
        ],
    );
    (m, vec![2.0, 3.0, -1.0])
}

fn print_vector(label: &str, values: &[f64]) {
    let rendered: Vec<String> = values.iter().map(|v| format!("{:.6}", v)).collect();
    println!("{}: [{}]", label, rendered.join(", "));
}

fn main() -> ExitCode {
    let _ = CombinedLogger::init(vec![TermLogger::new(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage(&args[0]);
        return ExitCode::FAILURE;
    }

    let (matrix, expected) = match args[1].as_str() {
        "p" => {
            let (m, expected) = predefined_system();
            (m, Some(expected))
        }
        "r" => {
            let Some(order) = args.get(2).and_then(|s| s.parse::<usize>().ok()) else {
                print_usage(&args[0]);
                return ExitCode::FAILURE;
            };
            if order == 0 {
                eprintln!("system order must be positive");
                return ExitCode::FAILURE;
            }
            (Matrix::random_diagonally_dominant(order), None)
        }
        _ => {
            print_usage(&args[0]);
            return ExitCode::FAILURE;
        }
    };
    let workers = args
        .get(if args[1] == "p" { 2 } else { 3 })
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(0);

    if matrix.rows <= 8 {
        println!("{}", matrix);
    } else {
        println!("Matrix {}x{}", matrix.rows, matrix.cols);
    }
    if let Some(expected) = &expected {
        print_vector("expected solution", expected);
    }

    let started = Instant::now();
    let parallel = match solve_parallel(&matrix, workers) {
        Ok(solution) => solution,
        Err(err) => {
            eprintln!("parallel solve failed: {}", err);
            return ExitCode::FAILURE;
        }
    };
    info!(
        "parallel solve finished in {} ms",
        started.elapsed().as_millis()
    );
    print_vector("solution", &parallel);

    let started = Instant::now();
    match solve_sequential(&matrix) {
        Ok(sequential) => {
            info!(
                "sequential cross-check finished in {} ms",
                started.elapsed().as_millis()
            );
            let max_delta = parallel
                .iter()
                .zip(&sequential)
                .map(|(p, s)| (p - s).abs())
                .fold(0.0f64, f64::max);
            if max_delta > TOLERANCE {
                warn!("engines disagree, max delta = {:e}", max_delta);
                return ExitCode::FAILURE;
            }
            info!("engines agree, max delta = {:e}", max_delta);
        }
        Err(err) => {
            eprintln!("sequential cross-check failed: {}", err);
            return ExitCode::FAILURE;
        }
    }

    if let Some(expected) = &expected {
        let max_err = parallel
            .iter()
            .zip(expected)
            .map(|(p, e)| (p - e).abs())
            .fold(0.0f64, f64::max);
        println!("max absolute error vs expected: {:.6}", max_err);
    }

    ExitCode::SUCCESS
}
