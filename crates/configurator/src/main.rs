use std::path::Path;

use configurator_lib::geometry::GeometryDescriptor;
use configurator_lib::{normalize_with_report, render_for_viewport, EngineSettings, Viewport};
use shared::{count_nodes, Geometry, SceneConfig};

const USAGE: &str = "usage: configurator <normalize|inspect|render> <file> [width height]";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "configurator=info,configurator_lib=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: &[String]) -> Result<String, String> {
    let (command, path) = match args {
        [command, path, ..] => (command.as_str(), Path::new(path)),
        _ => return Err(USAGE.to_string()),
    };
    let config = load_file(path)?;

    match command {
        "normalize" => serde_json::to_string_pretty(&config).map_err(|e| e.to_string()),
        "inspect" => Ok(inspect(&config)),
        "render" => {
            let viewport = parse_viewport(&args[2..])?;
            let settings = EngineSettings::load();
            let camera = settings.configure_camera(configurator_lib::CameraController::new(
                config.camera.clone(),
                viewport,
            ));
            let scene = configurator_lib::build_render_scene(&config, &camera);
            serde_json::to_string_pretty(&scene).map_err(|e| e.to_string())
        }
        other => Err(format!("unknown command '{}'\n{}", other, USAGE)),
    }
}

/// Read and normalize a scene document; corrections go to the log
fn load_file(path: &Path) -> Result<SceneConfig, String> {
    let json = std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let value: serde_json::Value =
        serde_json::from_str(&json).map_err(|e| format!("{}: {}", path.display(), e))?;
    let (config, report) = normalize_with_report(&value);
    for correction in &report.corrections {
        tracing::info!("corrected {}", correction);
    }
    Ok(config)
}

fn parse_viewport(args: &[String]) -> Result<Viewport, String> {
    match args {
        [] => Ok(Viewport::default()),
        [w, h, ..] => {
            let w: f64 = w.parse().map_err(|_| format!("invalid width '{}'", w))?;
            let h: f64 = h.parse().map_err(|_| format!("invalid height '{}'", h))?;
            if !(w > 0.0 && h > 0.0 && w.is_finite() && h.is_finite()) {
                return Err("viewport size must be positive".to_string());
            }
            Ok(Viewport::new(w, h))
        }
        [_] => Err(USAGE.to_string()),
    }
}

fn inspect(config: &SceneConfig) -> String {
    let render = render_for_viewport(config, Viewport::default());
    let mut unparsed = 0;
    for root in &config.components {
        root.walk(&mut |node| {
            if matches!(node.geometry, Some(Geometry::Unparsed(_))) {
                unparsed += 1;
            }
        });
    }
    let (mut meshes, mut assets, mut triangles) = (0, 0, 0);
    for component in &render.components {
        match &component.geometry {
            Some(GeometryDescriptor::Mesh(mesh)) => {
                meshes += 1;
                triangles += mesh.triangle_count();
            }
            Some(GeometryDescriptor::Asset(_)) => assets += 1,
            None => {}
        }
    }
    let hidden = render.components.iter().filter(|c| !c.visible).count();
    let d = config.dimensions;

    let mut out = String::new();
    out.push_str(&format!("Components: {} ({} hidden)\n", count_nodes(&config.components), hidden));
    out.push_str(&format!("Meshes: {} ({} triangles)\n", meshes, triangles));
    out.push_str(&format!("Assets: {}\n", assets));
    out.push_str(&format!("Unparsed geometry: {}\n", unparsed));
    out.push_str(&format!("Materials: {}\n", config.materials.len()));
    out.push_str(&format!("Dimensions: {} x {} x {} mm\n", d.width, d.height, d.depth));
    out.push_str(&format!("Camera: {:?}, zoom {:.3}\n", render.camera.mode, render.camera.zoom));
    out.push_str(&format!("Updated: {}", config.updated_at));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use configurator_lib::fixtures::door_scene;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_viewport() {
        assert_eq!(parse_viewport(&[]).unwrap(), Viewport::default());
        assert_eq!(parse_viewport(&args(&["1024", "768"])).unwrap(), Viewport::new(1024.0, 768.0));
        assert!(parse_viewport(&args(&["1024"])).is_err());
        assert!(parse_viewport(&args(&["0", "768"])).is_err());
        assert!(parse_viewport(&args(&["wide", "768"])).is_err());
    }

    #[test]
    fn test_inspect_summary() {
        let summary = inspect(&door_scene());
        assert!(summary.contains("Components: 7 (0 hidden)"), "{summary}");
        assert!(summary.contains("Meshes: 3"));
        assert!(summary.contains("Assets: 1"));
    }

    #[test]
    fn test_usage_errors() {
        assert!(run(&[]).is_err());
        assert!(run(&args(&["normalize"])).is_err());
        assert!(run(&args(&["normalize", "/definitely/missing.json"])).is_err());
    }
}
