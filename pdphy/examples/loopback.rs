//! In this example, we queue a GoodCRC frame through the transmit register
//! window, loop the line output straight back into the receiver, and drain
//! the recovered frame from the receive window.

use num_traits::FromPrimitive;
use pdcode::symbol::KCode;
use pdphy::{
    bus::{
        BusRequest,
        BusResponse,
        RX_ERRNO,
        RX_QUEUE,
        RX_TYPE,
        TX_DWRITE,
        TX_ERRNO,
        TX_KWRITE,
        TX_STATUS,
    },
    PhyConfig,
    Transceiver,
};

/// Sync-2 then three Sync-1: the ordered set opening a GoodCRC.
const OPEN_CODES: [u8; 4] = [1, 0, 0, 0];
/// GoodCRC header for message ID zero, followed by its CRC-32.
const PAYLOAD: [u8; 6] = [0x01, 0x01, 0x28, 0x13, 0xC5, 0x2F];

fn main() {
    let mut xcvr = Transceiver::new(PhyConfig::default());

    // ordered set, six data bytes, EOP: eleven words, well inside the queue
    for code in OPEN_CODES {
        tx_write(&mut xcvr, TX_KWRITE, code);
    }
    for byte in PAYLOAD {
        tx_write(&mut xcvr, TX_DWRITE, byte);
    }
    tx_write(&mut xcvr, TX_KWRITE, 5);

    // run both line domains in lockstep until the transmitter drains
    let mut ticks = 0u64;
    loop {
        for _ in 0..1000 {
            xcvr.loopback_tick();
        }
        ticks += 1000;
        if tx_read(&mut xcvr, TX_STATUS) & 0b100 != 0 {
            break;
        }
        assert!(ticks < 100_000, "transmitter never drained");
    }
    println!("wire released after {ticks} line ticks");

    // let the receive window's pointer synchronizers catch up, then drain
    for _ in 0..4 {
        xcvr.receiver.bus_tick(None);
    }
    loop {
        let ty = rx_read(&mut xcvr, RX_TYPE);
        if ty & 0b01 == 0 {
            break;
        }
        let word = rx_read(&mut xcvr, RX_QUEUE);
        if let Some(k) = KCode::from_u8(word).filter(|_| ty & 0b10 != 0) {
            println!("control {k}");
        } else {
            println!("data    {word:#04x}");
        }
    }
    assert_eq!(rx_read(&mut xcvr, RX_ERRNO), 0);
    assert_eq!(tx_read(&mut xcvr, TX_ERRNO), 0);
}

fn tx_write(xcvr: &mut Transceiver, addr: u8, data: u8) {
    let req = BusRequest { addr, write: true, data };
    assert_eq!(
        xcvr.transmitter.bus_tick(Some(req)),
        Some(BusResponse::Ack(0))
    );
}

fn tx_read(xcvr: &mut Transceiver, addr: u8) -> u8 {
    let req = BusRequest { addr, write: false, data: 0 };
    match xcvr.transmitter.bus_tick(Some(req)) {
        Some(BusResponse::Ack(data)) => data,
        other => panic!("read of {addr:#x} refused: {other:?}"),
    }
}

fn rx_read(xcvr: &mut Transceiver, addr: u8) -> u8 {
    let req = BusRequest { addr, write: false, data: 0 };
    match xcvr.receiver.bus_tick(Some(req)) {
        Some(BusResponse::Ack(data)) => data,
        other => panic!("read of {addr:#x} refused: {other:?}"),
    }
}
