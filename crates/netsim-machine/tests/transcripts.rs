use netsim_machine::{parse_script, write_transcripts, SimParams, Simulation};

fn run(script: &str, params: SimParams) -> Simulation {
    let mut sim = Simulation::new(params, 0);
    sim.load_script(parse_script(script).unwrap());
    sim.run().unwrap();
    sim
}

#[test]
fn every_device_gets_its_files() {
    let sim = run(
        "\
0 create hub H 2
0 create host A
0 connect A_1 H_1
0 send A 10110010
",
        SimParams::default(),
    );

    let dir = tempfile::tempdir().unwrap();
    write_transcripts(&sim, dir.path()).unwrap();

    let host_log = std::fs::read_to_string(dir.path().join("A.txt")).unwrap();
    assert!(host_log.contains("Time (ms)"));
    assert!(host_log.contains("Sent"));
    assert!(
        host_log.contains("     A      "),
        "device column should name the host"
    );

    let hub_log = std::fs::read_to_string(dir.path().join("H.txt")).unwrap();
    assert!(hub_log.contains("H_1"));
    assert!(hub_log.contains("H_2"));
    assert!(hub_log.contains("Rece . Sent"));
    assert!(hub_log.contains("   1 . 1"), "the driven bit echoes on H_1");
    assert!(hub_log.contains("---"), "the open port shows as detached");

    // Hosts also get their receipt files, empty here.
    assert_eq!(
        std::fs::read_to_string(dir.path().join("A_data.txt")).unwrap(),
        ""
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("A_payload.txt")).unwrap(),
        ""
    );
}

#[test]
fn receipts_show_up_in_the_data_file() {
    let sim = run(
        "\
0 create host A
0 create host B
0 mac A 1 000A
0 mac B 1 000B
0 connect A_1 B_1
0 send_frame A 000B AB
",
        SimParams::default(),
    );

    let dir = tempfile::tempdir().unwrap();
    write_transcripts(&sim, dir.path()).unwrap();

    let data = std::fs::read_to_string(dir.path().join("B_data.txt")).unwrap();
    let line = data.lines().next().expect("one receipt line");
    let fields: Vec<_> = line.split_whitespace().collect();
    assert_eq!(fields[1], "000A");
    assert_eq!(fields[2], "00AB");
    assert!(!line.ends_with("ERROR"));
}

#[test]
fn corrupted_receipts_carry_the_error_mark() {
    let sim = run(
        "\
0 create host A
0 create host B
0 mac A 1 000A
0 mac B 1 000B
0 connect A_1 B_1
0 send_frame A 000B AB
",
        SimParams {
            error_prob: 1.0,
            ..SimParams::default()
        },
    );

    let dir = tempfile::tempdir().unwrap();
    write_transcripts(&sim, dir.path()).unwrap();

    let data = std::fs::read_to_string(dir.path().join("B_data.txt")).unwrap();
    assert!(data.lines().next().unwrap().ends_with("ERROR"));

    let log = std::fs::read_to_string(dir.path().join("B.txt")).unwrap();
    assert!(log.contains("ERROR"));
}
