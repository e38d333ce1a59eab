//! End-to-end exit-code contract (§6/§7): a clean run exits 0 and writes
//! the Assignment table; a Dispatches row missing a required column exits
//! 2 and writes nothing.

use assert_cmd::Command;
use std::fs;
use tempfile::tempdir;

const DISPATCH_HEADER: &str = "dispatch_id,priority,required_skill,service_tier,equipment_installed,first_time_fix,appointment_start,appointment_end,customer_lat,customer_lon,city,state,expected_duration,assigned_technician_id";
const TECHNICIAN_HEADER: &str = "technician_id,primary_skill,tech_lat,tech_lon,city,state,workload_capacity,current_assignments";
const CALENDAR_HEADER: &str = "technician_id,date,available,shift_start,shift_end,max_assignments";

fn good_dispatch_row() -> String {
    "d1,Normal,fiber,,,,2026-03-05T09:00:00Z,2026-03-05T10:00:00Z,40.0,-74.0,Newark,NJ,60.0,".to_string()
}

fn technician_row() -> String {
    "t1,fiber,40.01,-74.01,Newark,NJ,8,0".to_string()
}

fn calendar_row() -> String {
    "t1,2026-03-05,true,08:00:00,17:00:00,5".to_string()
}

#[test]
fn clean_run_exits_zero_and_writes_the_assignment_table() {
    let dir = tempdir().unwrap();
    let dispatches = dir.path().join("dispatches.csv");
    let technicians = dir.path().join("technicians.csv");
    let calendar = dir.path().join("calendar.csv");
    let output = dir.path().join("assignments.csv");

    fs::write(&dispatches, format!("{DISPATCH_HEADER}\n{}\n", good_dispatch_row())).unwrap();
    fs::write(&technicians, format!("{TECHNICIAN_HEADER}\n{}\n", technician_row())).unwrap();
    fs::write(&calendar, format!("{CALENDAR_HEADER}\n{}\n", calendar_row())).unwrap();

    Command::cargo_bin("dispatch-cli")
        .unwrap()
        .args([
            "--dispatches", dispatches.to_str().unwrap(),
            "--technicians", technicians.to_str().unwrap(),
            "--calendar", calendar.to_str().unwrap(),
            "--output", output.to_str().unwrap(),
        ])
        .assert()
        .success();

    assert!(output.exists());
    let written = fs::read_to_string(&output).unwrap();
    assert!(written.contains("d1"));
}

#[test]
fn missing_required_column_exits_with_the_ingest_failure_code() {
    let dir = tempdir().unwrap();
    let dispatches = dir.path().join("dispatches.csv");
    let technicians = dir.path().join("technicians.csv");
    let calendar = dir.path().join("calendar.csv");
    let output = dir.path().join("assignments.csv");

    // required_skill column dropped entirely from the header.
    let bad_header = "dispatch_id,priority,service_tier,equipment_installed,first_time_fix,appointment_start,appointment_end,customer_lat,customer_lon,city,state,expected_duration,assigned_technician_id";
    let bad_row = "d1,Normal,,,,2026-03-05T09:00:00Z,2026-03-05T10:00:00Z,40.0,-74.0,Newark,NJ,60.0,";
    fs::write(&dispatches, format!("{bad_header}\n{bad_row}\n")).unwrap();
    fs::write(&technicians, format!("{TECHNICIAN_HEADER}\n{}\n", technician_row())).unwrap();
    fs::write(&calendar, format!("{CALENDAR_HEADER}\n{}\n", calendar_row())).unwrap();

    Command::cargo_bin("dispatch-cli")
        .unwrap()
        .args([
            "--dispatches", dispatches.to_str().unwrap(),
            "--technicians", technicians.to_str().unwrap(),
            "--calendar", calendar.to_str().unwrap(),
            "--output", output.to_str().unwrap(),
        ])
        .assert()
        .code(2);

    assert!(!output.exists());
}
