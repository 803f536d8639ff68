#![deny(clippy::all)]
#![deny(warnings)]

//! Typed command and response structs & enums.
//!
//! These structures represent the data payload of Klipper messages.

/// A top-level message that can be either a command from the host
/// or a response from the MCU.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Message<'a> {
    /// A command sent from the host to the MCU.
    Command(Command<'a>),
    /// A response sent from the MCU to the host.
    Response(Response<'a>),
}

/// A command to queue a single ramp segment for one stepper.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct CommandQueueStep {
    pub oid: u8,
    pub interval_ticks: u32,
    pub count: u16,
    pub add: i16,
}

/// `config_stepper_rt_mode`'s payload (see `stepper::mcu_drivers` crate).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct CommandConfigStepperRtMode {
    pub control_freq: u32,
    pub input_cycle: u16,
    /// `Fixed16_16` gain, carried as its raw bit pattern over the wire.
    pub input_factor: i32,
    pub max_freq: i32,
    pub max_acc: i32,
}

/// Commands sent from the host computer to the MCU.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Command<'a> {
    Identify {
        dict_version: &'a [u8],
    },
    GetConfig,
    GetStatus,
    /// `config_stepper oid step_pin dir_pin min_stop_interval invert_step`.
    ConfigStepper {
        oid: u8,
        step_pin: u8,
        dir_pin: u8,
        min_stop_interval: u32,
        invert_step: u8,
    },
    /// `config_stepper_rt_mode oid control_freq input_cycle input_factor max_freq max_acc`.
    ConfigStepperRtMode {
        oid: u8,
        params: CommandConfigStepperRtMode,
    },
    QueueStep(CommandQueueStep),
    /// `set_next_step_dir oid dir`.
    SetNextStepDir {
        oid: u8,
        dir: u8,
    },
    /// `reset_step_clock oid clock`.
    ResetStepClock {
        oid: u8,
        clock: u32,
    },
    /// `stepper_get_position oid`.
    GetStepperPosition {
        oid: u8,
    },
    /// `set_realtime_mode oid clock min_pos max_pos`.
    SetRealtimeMode {
        oid: u8,
        clock: u32,
        min_pos: i32,
        max_pos: i32,
    },
    /// `set_host_mode oid clock`.
    SetHostMode {
        oid: u8,
        clock: u32,
    },
    /// `stepper_stop oid`.
    StepperStop {
        oid: u8,
    },
    SetDigitalOut {
        pin: u8,
        value: u8,
    },
    SetPwmOut {
        pin: u8,
        value: u16,
    },
    /// A raw G-code line forwarded from the host's kinematics planner.
    GCode(&'a str),
    /// `emergency_stop`: latch every stepper's shutdown immediately.
    EmergencyStop,
    // Add other commands as they are implemented...
    Unknown(u8, &'a [u8]),
}

/// Responses sent from the MCU back to the host computer.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Response<'a> {
    Identify {
        is_config_valid: bool,
        version: &'a [u8],
        mcu_name: &'a [u8],
    },
    Status {
        // Define status fields as needed
    },
    Config {
        // Define config fields as needed
    },
    /// Reply to `stepper_get_position`: `stepper_position oid=%c pos=%i`.
    StepperPosition {
        oid: u8,
        pos: i32,
    },
    /// `stepper_rt_log pos=%i error=%i`, emitted once per `input_cycle` control
    /// ticks while a stepper is in realtime mode.
    StepperRtLog {
        oid: u8,
        pos: i32,
        error: i32,
    },
    /// A fatal shutdown notification; the host must reset the MCU.
    Shutdown {
        reason: &'a str,
    },
    /// A forwarded G-code line was accepted.
    GCodeOk,
    /// A forwarded G-code line was rejected.
    GCodeError(&'a str),
    /// A free-form diagnostic line.
    Log(&'a str),
    // Add other responses...
    Unknown,
}
