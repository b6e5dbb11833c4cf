//! Whole runs from table files to the written heatmap.

use heatmap_core::table::{read_coordinates, read_hotspots};
use heatmap_core::{
    Backend, Dimensions, Hotspot, HotspotField, InputError, OutputMode, RunConfig, SimError,
    Simulation, simulate, write_output,
};
use std::fs;

fn config(w: usize, h: usize, rounds: u32) -> RunConfig {
    RunConfig::new(Dimensions::new(w, h).unwrap(), rounds)
}

#[test]
fn zero_rounds_renders_seeded_state() {
    let out = simulate(&config(2, 1, 0), &[Hotspot::new(0, 0, 0, 3)]).unwrap();
    assert_eq!(out.as_slice(), &[1.0, 0.0]);
    assert_eq!(OutputMode::Dense.encode(&out).unwrap(), "X0\n");
}

#[test]
fn active_source_stays_saturated_and_spreads() {
    let out = simulate(&config(5, 1, 3), &[Hotspot::new(0, 0, 0, 10)]).unwrap();
    assert_eq!(out.get(0, 0), 1.0);
    let row = out.as_slice();
    assert!(row[1] > row[2] && row[2] > row[3]);
    assert_eq!(row[4], 0.0);
}

#[test]
fn expired_source_cools_down() {
    let hot = simulate(&config(3, 3, 2), &[Hotspot::new(1, 1, 0, 2)]).unwrap();
    let cooled = simulate(&config(3, 3, 6), &[Hotspot::new(1, 1, 0, 2)]).unwrap();
    assert_eq!(hot.get(1, 1), 1.0);
    assert!(cooled.get(1, 1) < 1.0);
}

#[test]
fn delayed_source_switches_on_at_its_round() {
    let before = simulate(&config(3, 1, 1), &[Hotspot::new(2, 0, 2, 4)]).unwrap();
    let after = simulate(&config(3, 1, 2), &[Hotspot::new(2, 0, 2, 4)]).unwrap();
    assert_eq!(before.as_slice(), &[0.0, 0.0, 0.0]);
    assert_eq!(after.get(2, 0), 1.0);
}

#[test]
fn table_files_drive_sparse_output() {
    let dir = tempfile::tempdir().unwrap();
    let hotspots_path = dir.path().join("hotspots.csv");
    let coords_path = dir.path().join("coords.csv");
    let output_path = dir.path().join("output.txt");
    fs::write(&hotspots_path, "x,y,startround,endround\n0,0,0,5\n").unwrap();
    fs::write(&coords_path, "x,y\n0,0\n2,1\n").unwrap();

    let mut cfg = config(3, 2, 4);
    cfg.backend = Backend::Serial;
    let hotspots = read_hotspots(&hotspots_path).unwrap();
    let mode = OutputMode::from_coordinates(Some(read_coordinates(&coords_path).unwrap()));
    mode.validate(cfg.dims).unwrap();

    let out = simulate(&cfg, &hotspots).unwrap();
    write_output(&output_path, &out, &mode).unwrap();

    let text = fs::read_to_string(&output_path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "1");
    let far: f64 = lines[1].parse().unwrap();
    assert!(far > 0.0 && far < 0.5);
}

#[test]
fn dense_output_has_one_line_per_row() {
    let out = simulate(
        &config(4, 3, 5),
        &[Hotspot::new(0, 0, 0, 9), Hotspot::new(3, 2, 1, 9)],
    )
    .unwrap();
    let text = OutputMode::Dense.encode(&out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|l| l.chars().count() == 4));
    assert!(lines[0].starts_with('X'));
    assert!(lines[2].ends_with('X'));
}

#[test]
fn out_of_bounds_hotspot_aborts_before_running() {
    let err = simulate(&config(2, 2, 3), &[Hotspot::new(0, 5, 0, 1)]).unwrap_err();
    assert!(matches!(
        err,
        SimError::Input(InputError::OutOfBounds { x: 0, y: 5, .. })
    ));
}

#[test]
fn driver_final_state_matches_simulate() {
    let cfg = config(6, 4, 7);
    let hotspots = [Hotspot::new(2, 1, 0, 3), Hotspot::new(5, 3, 4, 7)];
    let field = HotspotField::load(cfg.dims, &hotspots).unwrap();
    let mut sim = Simulation::new(&cfg, field).unwrap();
    while sim.round() < 3 {
        sim.step().unwrap();
    }
    let stepped = sim.into_final_state().unwrap();
    assert_eq!(stepped, simulate(&cfg, &hotspots).unwrap());
}
