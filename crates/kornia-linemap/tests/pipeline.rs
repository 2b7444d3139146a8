mod common;

use kornia_linemap::hypothesis::HypothesisConfig;
use kornia_linemap::linker::compute_perp_dist_oneway;
use kornia_linemap::{Line2d, LineMapper, LineMapperConfig, LinemapError, LineTrack};

use common::{all_neighbors, arc_views, ground_truth_lines};

const CONFIG: &str = r#"{
    "linker": {
        "linker_2d": {
            "th_angle": 8.0, "th_perp": 5.0, "th_overlap": 0.1,
            "use_angle": true, "use_perp": true, "use_overlap": true
        },
        "linker_3d": {
            "th_angle": 10.0, "th_perp": 0.05, "th_overlap": 0.01,
            "use_angle": true, "use_perp": true, "use_overlap": true,
            "use_scaleinv": false
        }
    },
    "remerge_linker_3d": {
        "th_angle": 5.0, "th_perp": 0.02, "th_overlap": 0.05,
        "use_angle": true, "use_perp": true, "use_overlap": true,
        "use_scaleinv": false
    },
    "filtering": {
        "th_angular2d": 5.0, "th_perp2d": 3.0, "th_angular3d": 10.0,
        "th_overlap": 0.5, "min_support_ns": 3, "num_outliers": 2
    },
    "max_remerge_iterations": 3,
    "var2d": 1.0
}"#;

#[test]
fn test_config_roundtrip() -> Result<(), serde_json::Error> {
    let config: LineMapperConfig = serde_json::from_str(CONFIG)?;
    assert_eq!(config.var2d, Some(1.0));
    let back: LineMapperConfig = serde_json::from_str(&serde_json::to_string(&config)?)?;
    assert_eq!(back, config);
    Ok(())
}

#[test]
fn test_pipeline_reconstructs_lines() -> Result<(), Box<dyn std::error::Error>> {
    let mapper = LineMapper::new(serde_json::from_str(CONFIG)?)?;
    let views = arc_views(6, 8.0);
    let gt = ground_truth_lines();
    let lines_2d: Vec<Vec<Line2d>> = views
        .iter()
        .map(|v| gt.iter().map(|l| l.projection(v)).collect())
        .collect();
    let hypotheses = HypothesisConfig {
        min_epipolar_iou: 0.5,
        th_sensitivity: 10.0,
        ranges: None,
    };

    let tracks: Vec<LineTrack> = mapper.run_with_triangulation(
        &lines_2d,
        &views,
        &all_neighbors(views.len()),
        &hypotheses,
    )?;

    assert_eq!(tracks.len(), 2);
    for (track, line) in tracks.iter().zip(&gt) {
        assert_eq!(track.count_views(), views.len());
        assert!(compute_perp_dist_oneway(&track.line, line) < 1e-6);
    }
    Ok(())
}

#[test]
fn test_pipeline_rejects_mismatched_inputs() -> Result<(), Box<dyn std::error::Error>> {
    let mapper = LineMapper::new(serde_json::from_str(CONFIG)?)?;
    let views = arc_views(3, 8.0);
    let res = mapper.run(
        &Default::default(),
        &vec![vec![]; 3],
        &views,
        &vec![vec![]; 2],
        &all_neighbors(3),
    );
    assert!(matches!(res, Err(LinemapError::MismatchedLengths { .. })));
    Ok(())
}
