use core::net::Ipv4Addr;

use netsim_machine::{parse_script, Op};
use netsim_protocol::MacAddr;

#[test]
fn every_verb_parses() {
    let script = "\
0 create hub H 4
0 create host A
0 create switch S 3
0 create router R 2
0 connect A_1 H_1
5 disconnect A_1
0 send A 10110010
0 send_frame A 0002 AB
0 mac A 1 000A
0 ip A 1 10.0.0.1 255.0.0.0
0 send_packet A 10.0.0.2 CAFE
0 ping A 10.0.0.2
0 route R add 10.0.0.0 255.0.0.0 10.0.0.254 1
0 route R remove 10.0.0.0 255.0.0.0 10.0.0.254 1
0 route R reset
";
    let instructions = parse_script(script).unwrap();
    assert_eq!(instructions.len(), 15);

    assert_eq!(
        instructions[0].op,
        Op::CreateHub {
            name: "H".into(),
            ports: 4
        }
    );
    assert!(matches!(
        &instructions[6].op,
        Op::SendFrame { host, dest, payload }
            if host == "A" && *dest == MacAddr(2) && payload.len() == 8
    ));
    assert!(matches!(
        &instructions[8].op,
        Op::AssignIp { ip, mask, .. }
            if *ip == Ipv4Addr::new(10, 0, 0, 1) && *mask == Ipv4Addr::new(255, 0, 0, 0)
    ));
    assert!(matches!(
        &instructions[11].op,
        Op::RouteAdd { device, route }
            if device == "R" && route.iface == 1 && route.mask == Ipv4Addr::new(255, 0, 0, 0)
    ));

    // The disconnect at tick 5 sorts after every tick-0 instruction.
    assert!(matches!(&instructions[14].op, Op::Disconnect { port } if port == "A_1"));
    assert_eq!(instructions[14].time, 5);
}

#[test]
fn instructions_sort_stably_by_time() {
    let script = "\
5 create host B
0 create host A
5 create host C
";
    let instructions = parse_script(script).unwrap();
    let names: Vec<_> = instructions
        .iter()
        .map(|inst| match &inst.op {
            Op::CreateHost { name } => name.as_str(),
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(names, ["A", "B", "C"]);
}

#[test]
fn comments_and_blank_lines_are_skipped() {
    let script = "\
# topology
0 create host A

# traffic
0 send A 1
";
    assert_eq!(parse_script(script).unwrap().len(), 2);
}

#[test]
fn send_accepts_binary_only() {
    assert!(parse_script("0 send A 1012").is_err());
    let instructions = parse_script("0 send A 101").unwrap();
    assert!(matches!(
        &instructions[0].op,
        Op::Send { data, .. } if data == &vec![1, 0, 1]
    ));
}

#[test]
fn malformed_lines_carry_their_line_number() {
    let err = parse_script("0 create host A\nnonsense here\n").unwrap_err();
    assert_eq!(err.line, 2);

    let err = parse_script("0 frobnicate A").unwrap_err();
    assert!(err.to_string().contains("frobnicate"));

    assert!(parse_script("0 create hub H").is_err(), "missing port count");
    assert!(parse_script("0 send_frame A 0xZZ AB").is_err(), "bad MAC");
    assert!(parse_script("0 ip A 1 10.0.0 255.0.0.0").is_err(), "bad IP");
    assert!(parse_script("0 route R add 10.0.0.0 255.0.0.0").is_err());
    assert!(parse_script("0 connect A_1 B_1 extra").is_err());
}
