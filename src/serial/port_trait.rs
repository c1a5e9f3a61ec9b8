//! Trait abstraction for serial port operations to enable testing

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Trait for serial port I/O operations
#[async_trait]
pub trait SerialPortIO: Send {
    /// Read whatever is available into `buf`
    ///
    /// Returns the number of bytes read; `0` means the link is closed.
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Wrapper around any async byte stream (usually `tokio_serial::SerialStream`)
/// that implements SerialPortIO
pub struct TokioSerialPort<R> {
    port: R,
}

impl<R> TokioSerialPort<R> {
    pub fn new(port: R) -> Self {
        Self { port }
    }
}

#[async_trait]
impl<R> SerialPortIO for TokioSerialPort<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wraps_async_reader() {
        let mock = tokio_test::io::Builder::new()
            .read(&[0xC8, 0x18])
            .read(&[0x16])
            .build();
        let mut port = TokioSerialPort::new(mock);

        let mut buf = [0u8; 8];
        assert_eq!(port.read(&mut buf).await.unwrap(), 2);
        assert_eq!(&buf[..2], &[0xC8, 0x18]);
        assert_eq!(port.read(&mut buf).await.unwrap(), 1);
        assert_eq!(port.read(&mut buf).await.unwrap(), 0);
    }
}
