use inciser_communication::{CommandChannel, MotionConfig, MotionController, SimulatedLaser};
use inciser_core::{Error, LaserHead, Point};
use std::time::Duration;

fn fast_config() -> MotionConfig {
    MotionConfig {
        query_retry: Duration::ZERO,
        settle_delay: Duration::ZERO,
        poll_interval: Duration::ZERO,
        ..MotionConfig::default()
    }
}

fn controller_with(laser: SimulatedLaser) -> MotionController<SimulatedLaser> {
    MotionController::new(CommandChannel::new(laser, 20), fast_config())
}

fn written(motion: &MotionController<SimulatedLaser>) -> Vec<String> {
    motion.channel().link().written().to_vec()
}

#[test]
fn test_burn_delta_encodes_setpoints() {
    let mut motion = controller_with(SimulatedLaser::new());
    motion.burn(1.0, 0.0, Some(100), Some(50)).unwrap();
    motion.burn(0.0, 1.0, Some(100), Some(50)).unwrap();
    motion.burn(0.0, 0.0, None, Some(60)).unwrap();
    motion.burn(2.0, 2.0, Some(200), None).unwrap();

    assert_eq!(
        written(&motion),
        vec![
            "G1X1.000000S50F100",
            "G1Y1.000000",
            "G1S60",
            "G1X2.000000Y2.000000F200",
        ]
    );
    assert_eq!(motion.logical_position(), Point::new(3.0, 3.0));
}

#[test]
fn test_move_relative_restores_setpoints() {
    let mut motion = controller_with(SimulatedLaser::new());
    motion.set_power(50);
    motion.set_speed(300);
    motion.move_relative(5.0, 0.0).unwrap();
    assert_eq!(motion.setpoints(), (50, 300));

    motion.burn(0.0, 0.0, None, None).unwrap();
    assert_eq!(written(&motion), vec!["G1X5.000000S0F24000", "G1S50F300"]);
}

#[test]
fn test_synchronous_move_waits_for_arrival() {
    let mut motion = controller_with(SimulatedLaser::new().with_settle_queries(3));
    motion.move_relative_synchronous(10.0, 5.0).unwrap();

    let laser = motion.channel().link();
    assert_eq!(laser.position(), Point::new(10.0, 5.0));
    let queries = laser.written().iter().filter(|c| c.as_str() == "?").count();
    // One query for the start, three while still moving, one on arrival
    assert_eq!(queries, 5);
    assert_eq!(motion.channel().in_flight(), 0);
}

#[test]
fn test_synchronous_zero_move_is_noop() {
    let mut motion = controller_with(SimulatedLaser::new());
    motion.move_relative_synchronous(0.0, 0.0).unwrap();
    assert!(written(&motion).is_empty());
}

#[test]
fn test_soft_scaling_applies_to_target() {
    let mut motion = controller_with(SimulatedLaser::new());
    motion.set_soft_scaling(1.0, 2.0);
    motion.move_relative_synchronous(0.0, 3.0).unwrap();

    assert!(written(&motion).contains(&"G1Y6.000000S0F24000".to_string()));
    assert_eq!(motion.channel().link().position(), Point::new(0.0, 6.0));
    assert_eq!(motion.logical_position(), Point::new(0.0, 3.0));
}

#[test]
fn test_absolute_moves_track_logical_position() {
    let mut motion = controller_with(SimulatedLaser::new());
    motion.move_absolute(10.0, 20.0).unwrap();
    motion.move_absolute(-4.25, 7.5).unwrap();
    assert!(motion
        .logical_position()
        .within(&Point::new(-4.25, 7.5), 1e-9));

    motion.move_absolute(0.0, 0.0).unwrap();
    assert!(motion.logical_position().within(&Point::default(), 1e-9));
}

#[test]
fn test_absolute_synchronous_move() {
    let mut motion = controller_with(SimulatedLaser::new().with_settle_queries(1));
    motion.set_soft_origin();
    motion.move_absolute_synchronous(7.0, 9.0).unwrap();
    motion.move_absolute_synchronous(7.0, 1.0).unwrap();
    assert_eq!(motion.channel().link().position(), Point::new(7.0, 1.0));
    assert_eq!(motion.logical_position(), Point::new(7.0, 1.0));
}

#[test]
fn test_burn_stationary_without_duration() {
    let mut motion = controller_with(SimulatedLaser::new());
    motion.burn_stationary(Duration::ZERO, Some(50)).unwrap();
    assert_eq!(written(&motion), vec!["G1S50F1000", "G0"]);
    assert_eq!(motion.channel().in_flight(), 0);
}

#[test]
fn test_unschedulable_burn_never_fires() {
    let mut motion = controller_with(SimulatedLaser::new());
    let err = motion
        .burn_stationary(Duration::MAX, Some(50))
        .unwrap_err();
    assert!(matches!(err, Error::DurationOutOfRange(_)));
    assert!(written(&motion).is_empty());
    assert_eq!(motion.channel().in_flight(), 0);
}

#[test]
fn test_burn_stationary_keeps_alive() {
    let mut motion = MotionController::new(
        CommandChannel::new(SimulatedLaser::new(), 20),
        MotionConfig {
            keepalive_interval: Duration::from_millis(20),
            ..fast_config()
        },
    );
    motion
        .burn_stationary(Duration::from_millis(100), Some(50))
        .unwrap();

    let commands = written(&motion);
    let burns = commands.iter().filter(|c| c.starts_with("G1")).count();
    assert!(burns >= 3, "expected keep-alive burns, got {:?}", commands);
    assert_eq!(commands.last().map(String::as_str), Some("G0"));
    // Power is sent once, then re-issued burns are bare
    assert_eq!(commands.iter().filter(|c| c.contains('S')).count(), 1);
}

#[test]
fn test_burn_rectangle() {
    let mut motion = controller_with(SimulatedLaser::new());
    motion
        .burn_rectangle(30.0, 20.0, Some(50), Some(3000))
        .unwrap();
    assert_eq!(
        written(&motion),
        vec![
            "G1Y20.000000S50F3000",
            "G1X30.000000",
            "G1Y-20.000000",
            "G1X-30.000000",
            "G1S0",
        ]
    );
    assert_eq!(motion.logical_position(), Point::default());
}

#[test]
fn test_machine_settings_commands() {
    let mut motion = controller_with(SimulatedLaser::new());
    motion.disable_hard_limits().unwrap();
    motion.set_scaling(1.0, 0.5).unwrap();
    motion.set_constant_power().unwrap();
    motion.set_variable_power().unwrap();
    motion.sync().unwrap();
    assert_eq!(
        written(&motion),
        vec!["$21=0", "$100=100", "$101=50", "M3", "M4"]
    );
}

#[test]
fn test_laser_head_beam_control() {
    let mut motion = controller_with(SimulatedLaser::new());
    LaserHead::enable_beam(&mut motion).unwrap();
    LaserHead::disable_beam(&mut motion).unwrap();
    assert_eq!(written(&motion), vec!["M3", "M5"]);
}

#[test]
fn test_device_error_aborts_move() {
    let mut motion = controller_with(SimulatedLaser::new().fail_command("G1", "error:9"));
    let err = motion.move_relative_synchronous(1.0, 1.0).unwrap_err();
    assert!(err.is_device_error());
}
