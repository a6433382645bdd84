//! Conversions between jack crate types and ponte types.

use ponte_core::{
    Bbt, ClientOptions, Error, PortDirection, PortHandle, PortInfo, PortKind, TransportPosition,
    TransportState,
};

pub(crate) fn backend(e: jack::Error) -> Error {
    Error::Backend(e.to_string())
}

pub(crate) fn client_options(options: ClientOptions) -> jack::ClientOptions {
    let mut flags = jack::ClientOptions::empty();
    if options.no_start_server {
        flags |= jack::ClientOptions::NO_START_SERVER;
    }
    if options.use_exact_name {
        flags |= jack::ClientOptions::USE_EXACT_NAME;
    }
    flags
}

pub(crate) fn port_kind(port_type: &str) -> Option<PortKind> {
    if port_type.contains("audio") {
        Some(PortKind::Audio)
    } else if port_type.contains("midi") {
        Some(PortKind::Midi)
    } else {
        None
    }
}

pub(crate) fn port_direction(flags: jack::PortFlags) -> Option<PortDirection> {
    if flags.contains(jack::PortFlags::IS_INPUT) {
        Some(PortDirection::Input)
    } else if flags.contains(jack::PortFlags::IS_OUTPUT) {
        Some(PortDirection::Output)
    } else {
        None
    }
}

/// Snapshot of a JACK port. The handle is the address of the `jack_port_t`.
pub(crate) fn port_info<PS: jack::PortSpec>(port: &jack::Port<PS>) -> Option<PortInfo> {
    let full_name = port.name().ok()?;
    let flags = port.flags();
    let kind = port_kind(&port.port_type().ok()?)?;
    let direction = port_direction(flags)?;
    let handle = PortHandle::new(port.raw() as usize as u64);
    let info = PortInfo::new(handle, full_name, kind, direction);
    Some(if flags.contains(jack::PortFlags::IS_PHYSICAL) {
        info.physical()
    } else {
        info
    })
}

#[allow(unreachable_patterns)]
pub(crate) fn transport_state(state: jack::TransportState) -> TransportState {
    match state {
        jack::TransportState::Stopped => TransportState::Stopped,
        jack::TransportState::Rolling => TransportState::Rolling,
        jack::TransportState::Starting => TransportState::Starting,
        _ => TransportState::Unknown,
    }
}

pub(crate) fn bbt_from_jack(bbt: &jack::TransportBBT) -> Bbt {
    Bbt {
        bar: bbt.bar as u32,
        beat: bbt.beat as u32,
        tick: bbt.tick as u32,
        bar_start_tick: bbt.bar_start_tick,
        beats_per_bar: bbt.sig_num,
        beat_type: bbt.sig_denom,
        ticks_per_beat: bbt.ticks_per_beat,
        beats_per_minute: bbt.bpm,
    }
}

#[allow(clippy::needless_update)]
pub(crate) fn bbt_to_jack(bbt: &Bbt) -> jack::TransportBBT {
    jack::TransportBBT {
        bar: bbt.bar as usize,
        beat: bbt.beat as usize,
        tick: bbt.tick as usize,
        sig_num: bbt.beats_per_bar,
        sig_denom: bbt.beat_type,
        ticks_per_beat: bbt.ticks_per_beat,
        bpm: bbt.beats_per_minute,
        bar_start_tick: bbt.bar_start_tick,
        ..Default::default()
    }
}

pub(crate) fn position_from_jack(
    state: jack::TransportState,
    pos: &jack::TransportPosition,
) -> TransportPosition {
    TransportPosition {
        state: transport_state(state),
        frame: pos.frame(),
        frame_rate: pos.frame_rate(),
        usecs: pos.usecs(),
        bbt: pos.bbt().as_ref().map(bbt_from_jack),
    }
}

pub(crate) fn position_to_jack(
    position: &TransportPosition,
) -> Result<jack::TransportPosition, Error> {
    let mut pos = jack::TransportPosition::default();
    pos.set_frame(position.frame);
    if let Some(bbt) = &position.bbt {
        pos.set_bbt(Some(bbt_to_jack(bbt)))
            .map_err(|e| Error::InvalidBbt(format!("{:?}", e)))?;
    }
    Ok(pos)
}
