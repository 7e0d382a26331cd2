use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_stm32::usart::{BufferedUart, Config as UartConfig, DataBits, Parity, StopBits};
use embassy_time::{Duration, Timer};
use embedded_io_async::{Read, Write};
use heapless::String;
use static_cell::StaticCell;

use crate::console::{
    ConsoleSession, MAX_LINE_LEN, MAX_REPLY_LEN, QueuedControl, RequestQueue, SessionError,
};

const CONSOLE_BAUD: u32 = 115_200;
const CONSOLE_BUFFER_SIZE: usize = MAX_LINE_LEN * 2;
const PROMPT: &[u8] = b"> ";

static UART_TX_BUFFER: StaticCell<[u8; MAX_REPLY_LEN]> = StaticCell::new();
static UART_RX_BUFFER: StaticCell<[u8; CONSOLE_BUFFER_SIZE]> = StaticCell::new();

embassy_stm32::bind_interrupts!(struct UartIrqs {
    USART3_4_5_6_LPUART1 => embassy_stm32::usart::BufferedInterruptHandler<hal::peripherals::USART5>;
});

#[embassy_executor::task]
pub async fn run(
    requests: &'static RequestQueue,
    usart: Peri<'static, hal::peripherals::USART5>,
    tx_pin: Peri<'static, hal::peripherals::PB0>,
    rx_pin: Peri<'static, hal::peripherals::PB1>,
) -> ! {
    let mut config = UartConfig::default();
    config.baudrate = CONSOLE_BAUD;
    config.data_bits = DataBits::DataBits8;
    config.stop_bits = StopBits::STOP1;
    config.parity = Parity::ParityNone;

    let uart = BufferedUart::new(
        usart,
        rx_pin,
        tx_pin,
        UART_TX_BUFFER.init([0; MAX_REPLY_LEN]),
        UART_RX_BUFFER.init([0; CONSOLE_BUFFER_SIZE]),
        UartIrqs,
        config,
    )
    .expect("failed to initialize console UART");
    let (mut tx, mut rx) = uart.split();

    let mut session = ConsoleSession::new(QueuedControl::new(requests.sender()));
    let mut reply: String<MAX_REPLY_LEN> = String::new();
    let mut ingress = [0u8; MAX_LINE_LEN];

    write_all(&mut tx, PROMPT).await;
    loop {
        let count = match rx.read(&mut ingress).await {
            Ok(count) => count,
            Err(_) => {
                defmt::warn!("console: UART read error");
                Timer::after(Duration::from_millis(5)).await;
                continue;
            }
        };

        for &byte in &ingress[..count] {
            match session.ingest(byte, &mut reply) {
                Ok(false) => {}
                Ok(true) => {
                    for line in reply.split('\n') {
                        write_all(&mut tx, line.as_bytes()).await;
                        write_all(&mut tx, b"\r\n").await;
                    }
                    write_all(&mut tx, PROMPT).await;
                }
                Err(SessionError::LineOverflow) => {
                    defmt::warn!("console: line exceeds {} bytes", MAX_LINE_LEN);
                }
                Err(SessionError::InvalidUtf8) => {
                    write_all(&mut tx, b"error: invalid utf-8\r\n").await;
                    write_all(&mut tx, PROMPT).await;
                }
            }
        }
    }
}

async fn write_all<W: Write>(tx: &mut W, data: &[u8]) {
    if tx.write_all(data).await.is_err() || tx.flush().await.is_err() {
        defmt::warn!("console: UART write error");
        Timer::after(Duration::from_millis(5)).await;
    }
}
