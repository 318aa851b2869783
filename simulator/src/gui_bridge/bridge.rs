use crate::generator::profile::{build_psd_chunk, GeneratorConfig};
use crate::gui_bridge::model::VisualizationModel;
use crate::workflow::runner::Runner;
use anyhow::Result;
use serde_json::json;
use std::{
    net::SocketAddr,
    sync::{Arc, RwLock},
    thread,
};
use tokio::runtime::Builder;
use warp::{http::StatusCode, Filter};

fn gui_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9000))
}

#[derive(Debug)]
struct WarpError;

impl warp::reject::Reject for WarpError {}

/// Bridge that hosts the visualization HTTP endpoint and processes
/// incoming synthetic-scan requests.
pub struct GuiBridge {
    state: Arc<RwLock<VisualizationModel>>,
}

impl GuiBridge {
    pub fn new(runner: Arc<Runner>) -> Self {
        let state = Arc::new(RwLock::new(VisualizationModel::default()));
        let state_for_filter = state.clone();
        let state_filter = warp::any().map(move || state_for_filter.clone());
        let runner_filter = warp::any().map(move || runner.clone());

        let get_route = warp::path("result")
            .and(warp::get())
            .and(state_filter.clone())
            .map(|state: Arc<RwLock<VisualizationModel>>| {
                warp::reply::json(&*state.read().unwrap())
            });

        let generator_route = warp::path("ingest-config")
            .and(warp::post())
            .and(warp::body::json())
            .and(state_filter)
            .and(runner_filter)
            .and_then(
                |config: GeneratorConfig,
                 state: Arc<RwLock<VisualizationModel>>,
                 runner: Arc<Runner>| async move {
                    match build_psd_chunk(&config).and_then(|chunk| runner.execute(&chunk)) {
                        Ok(result) => {
                            let model = VisualizationModel::from_result(&result);
                            let aim_count = model.aim_points.len();
                            let mut guard = state.write().unwrap();
                            *guard = model;
                            if let Some(name) = config.scenario.as_ref() {
                                println!("[GUI] Scenario {} -> aim points {}", name, aim_count);
                            }
                            Ok::<_, warp::Rejection>(warp::reply::with_status(
                                warp::reply::json(&json!({
                                    "status": "ok",
                                    "aim_points": aim_count,
                                    "description": config.description.clone().unwrap_or_default()
                                })),
                                StatusCode::OK,
                            ))
                        }
                        Err(err) => {
                            eprintln!("ingest-config error: {}", err);
                            Err(warp::reject::custom(WarpError))
                        }
                    }
                },
            );

        thread::spawn(move || {
            let routes = get_route.or(generator_route);
            let runtime = Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("failed to build runtime");
            runtime.block_on(async move {
                warp::serve(routes).run(gui_bind_address()).await;
            });
        });

        Self { state }
    }

    pub fn publish(&self, model: &VisualizationModel) -> Result<()> {
        let mut guard = self.state.write().unwrap();
        *guard = model.clone();
        println!(
            "[GUI] leakage map {}x{}, aim points: {}",
            guard.x_div,
            guard.y_div,
            guard.aim_points.len()
        );
        Ok(())
    }

    pub fn publish_status(&self, message: &str) {
        println!("[GUI] {}", message);
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> VisualizationModel {
        self.state.read().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::build_default_chunk;
    use crate::workflow::config::WorkflowConfig;
    use crate::workflow::runner::Runner;
    use std::sync::Arc;

    #[test]
    fn gui_bridge_updates_state() {
        let cfg = WorkflowConfig::default();
        let runner = Arc::new(Runner::new(cfg));
        let gui = GuiBridge::new(runner.clone());
        let chunk = build_default_chunk().unwrap();
        let result = runner.execute(&chunk).unwrap();
        let model = VisualizationModel::from_result(&result);
        gui.publish(&model).unwrap();
        assert_eq!(gui.snapshot().aim_points.len(), result.aim_points.len());
        assert_eq!(gui.snapshot().hump_count, result.hump_count);
    }
}
