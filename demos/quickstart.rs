//! Quickstart: run a full federated simulation and explain a prediction

use cardio_fl::config::CLIENT_NAMES;
use cardio_fl::{explain_prediction, Explanation, SimulationConfig, TrainingManager};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cardio_fl=info".into()),
        )
        .init();

    println!("Cardio-FL Quickstart Demo\n");

    let config = SimulationConfig::default();
    println!("Participating clients:");
    for name in CLIENT_NAMES {
        println!("  - {}", name);
    }
    println!(
        "\nTraining {} rounds across {} clients ({} samples each)...\n",
        config.num_rounds, config.num_clients, config.samples_per_client
    );

    let manager = TrainingManager::new(config);
    manager.start().expect("no run is in progress");
    manager.wait();

    let summary = manager.summary();
    for record in &summary.rounds {
        println!(
            "Round {}: accuracy {:.4}, loss {:.4}",
            record.round,
            record.accuracy,
            record.loss.unwrap_or(f32::NAN)
        );
    }
    println!(
        "\nAverage accuracy {:.4}, improvement {:+.4}",
        summary.average_accuracy, summary.improvement
    );

    // Explain one prediction with the trained global model.
    let parameters = manager.final_parameters();
    let patient = vec![0.8, 1.0, 0.4, 0.9, 1.1, 0.0, 0.3, -0.7, 1.0, 0.6, 0.5, 0.4, 0.2];
    match explain_prediction(parameters.as_ref(), &patient).expect("13 features supplied") {
        Explanation::Explained {
            prediction,
            risk_level,
            confidence,
            feature_importance,
        } => {
            println!(
                "\nPrediction: {:.3} ({:?} risk, confidence {:.2})",
                prediction, risk_level, confidence
            );
            println!("Top factors:");
            for attribution in feature_importance.iter().take(3) {
                println!(
                    "  {:<16} value {:+.2}  contribution {:+.4}",
                    attribution.feature, attribution.value, attribution.attribution
                );
            }
        }
        Explanation::Unavailable { reason } => println!("\nNo explanation: {}", reason),
    }
}
