//! The assembled PHY halves.
//!
//! Each half owns its engine, its queue, and its bus front-end, and exposes
//! exactly two tick methods: `line_tick` for the line clock domain and
//! `bus_tick` for the bus clock domain. The caller interleaves them in
//! whatever ratio its clocks produce; every cross-domain signal inside goes
//! through the queue's Gray-pointer crossing or a two-flop synchronizer,
//! so any interleaving is safe.

use clkcross::TwoFlop;
use tracing::debug;

use crate::{
    bus::{
        BusRequest,
        BusResponse,
        RxFrontEnd,
        TxFrontEnd,
    },
    error::RxLatches,
    rx::Receiver,
    tx::{
        LineOut,
        Transmitter,
    },
    PhyConfig,
    Queue,
};

/// Receive half: line decoder, receive queue, and register window.
#[derive(Debug, Clone)]
pub struct PhyReceiver {
    engine: Receiver,
    queue: Queue,
    front: RxFrontEnd,
    latch_sync: TwoFlop<RxLatches>,
}

impl PhyReceiver {
    #[must_use]
    pub fn new(config: PhyConfig) -> Self {
        Self {
            engine: Receiver::new(config),
            queue: Queue::new(),
            front: RxFrontEnd::new(),
            latch_sync: TwoFlop::new(),
        }
    }

    /// One line-domain cycle: decode the line level and enqueue any
    /// completed word. A word arriving at a full queue is dropped and the
    /// overflow flag raised.
    pub fn line_tick(&mut self, line: bool) {
        let word = self.engine.line_tick(line);
        let view = self.queue.write_tick(word);
        if view.write_err {
            self.engine.note_write_rejected();
        }
    }

    /// One bus-domain cycle with at most one master request.
    pub fn bus_tick(&mut self, request: Option<BusRequest>) -> Option<BusResponse> {
        self.latch_sync.sample(self.engine.latches());
        self.front
            .transact(request, self.latch_sync.output(), &mut self.queue)
    }

    /// The engine's fault flags as the line domain sees them, ahead of the
    /// synchronizer.
    #[must_use]
    pub fn latches(&self) -> RxLatches {
        self.engine.latches()
    }

    pub fn reset(&mut self) {
        debug!("receive path reset");
        self.engine.reset();
        self.queue.reset();
        self.front.reset();
        self.latch_sync.reset_to(RxLatches::default());
    }
}

/// Transmit half: register window, transmit queue, and line encoder.
#[derive(Debug, Clone)]
pub struct PhyTransmitter {
    engine: Transmitter,
    queue: Queue,
    front: TxFrontEnd,
    idle_sync: TwoFlop<bool>,
    underrun_sync: TwoFlop<bool>,
}

impl PhyTransmitter {
    #[must_use]
    pub fn new(config: PhyConfig) -> Self {
        Self {
            engine: Transmitter::new(config),
            queue: Queue::new(),
            front: TxFrontEnd::new(),
            idle_sync: TwoFlop::preloaded(true),
            underrun_sync: TwoFlop::new(),
        }
    }

    /// One line-domain cycle: honor the engine's pending pop and drive one
    /// tick of line output.
    pub fn line_tick(&mut self) -> LineOut {
        let pop = self.engine.take_pop_request();
        let view = self.queue.read_tick(pop);
        self.engine.line_tick(&view)
    }

    /// One bus-domain cycle with at most one master request.
    pub fn bus_tick(&mut self, request: Option<BusRequest>) -> Option<BusResponse> {
        self.idle_sync.sample(self.engine.is_idle());
        self.underrun_sync.sample(self.engine.underrun());
        self.front.transact(
            request,
            self.idle_sync.output(),
            self.underrun_sync.output(),
            &mut self.queue,
        )
    }

    pub fn reset(&mut self) {
        debug!("transmit path reset");
        self.engine.reset();
        self.queue.reset();
        self.front.reset();
        self.idle_sync.reset_to(true);
        self.underrun_sync.reset_to(false);
    }
}

/// Both halves under one roof, with a helper that loops the transmit line
/// straight back into the receiver.
#[derive(Debug, Clone)]
pub struct Transceiver {
    pub receiver: PhyReceiver,
    pub transmitter: PhyTransmitter,
}

impl Transceiver {
    #[must_use]
    pub fn new(config: PhyConfig) -> Self {
        Self {
            receiver: PhyReceiver::new(config),
            transmitter: PhyTransmitter::new(config),
        }
    }

    /// One line-domain cycle for both halves, with the transmit output fed
    /// to the receiver as its line level.
    pub fn loopback_tick(&mut self) -> LineOut {
        let out = self.transmitter.line_tick();
        self.receiver.line_tick(out.level());
        out
    }

    pub fn reset(&mut self) {
        self.receiver.reset();
        self.transmitter.reset();
    }
}
