use futures::{SinkExt, StreamExt};
use std::io;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::{
    codec::{AnyDelimiterCodec, FramedRead, FramedWrite, LinesCodec},
    sync::CancellationToken,
};
use tracing::{debug, info, warn};

use crate::connection::{line_codec, read_line, Session};

/// Shown to the user when the server side of the connection goes away.
pub const SERVER_DISCONNECTED: &str = "Server disconnected";

/// Shown to the user when a line could not be delivered to the server.
pub const CONNECTION_DISCONNECTED: &str = "Connection disconnected";

/// Why a relay stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEnd {
    /// The server connection hit EOF or an I/O error, or user output could not be written.
    Disconnected,
    /// User input was exhausted.
    Finished,
    /// The other relay ended first.
    Cancelled,
}

/// Outcome of [`Session::stream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamReport {
    /// How the server to user relay ended.
    pub inbound: RelayEnd,
    /// How the user to server relay ended.
    pub outbound: RelayEnd,
    /// Lines forwarded from the server to the user.
    pub received: usize,
    /// Lines forwarded from the user to the server.
    pub sent: usize,
}

impl<Reader, Writer> Session<Reader, Writer>
where
    Reader: AsyncRead + Unpin,
    Writer: AsyncWrite + Unpin,
{
    /// Relay lines server to `output` and `input` to server, concurrently, until the session ends.
    ///
    /// # Termination
    /// Whichever relay ends first cancels the other, so this returns once both have stopped.
    /// The inbound relay ends on EOF or an error from the server and writes [`SERVER_DISCONNECTED`].
    /// The outbound relay ends on EOF of `input` (closing the write side of the transport), or
    /// when a line cannot be sent, in which case [`CONNECTION_DISCONNECTED`] is written.
    ///
    /// `input` and `output` are borrowed from the caller: they are never shut down here.
    pub async fn stream<Input, Output>(self, input: Input, output: &mut Output) -> StreamReport
    where
        Input: AsyncRead + Unpin,
        Output: AsyncWrite + Unpin,
    {
        let token = CancellationToken::new();
        let input = FramedRead::new(input, line_codec());

        let ((inbound, received), (outbound, sent)) = tokio::join!(
            relay_inbound(self.lines, &mut *output, token.clone()),
            relay_outbound(input, self.sink, token),
        );

        if outbound == RelayEnd::Disconnected {
            if let Err(e) = write_line(output, CONNECTION_DISCONNECTED).await {
                warn!("Failed to write disconnect notice: {e}");
            }
        }

        let report = StreamReport {
            inbound,
            outbound,
            received,
            sent,
        };
        info!(?report, "Chat streaming ended");
        report
    }
}

/// Forward every line from the server to `output`.
async fn relay_inbound<Reader, Output>(
    mut lines: FramedRead<Reader, AnyDelimiterCodec>,
    output: &mut Output,
    token: CancellationToken,
) -> (RelayEnd, usize)
where
    Reader: AsyncRead + Unpin,
    Output: AsyncWrite + Unpin,
{
    let mut received = 0;
    let end = loop {
        tokio::select! {
            line = read_line(&mut lines) => {
                match line {
                    Some(Ok(line)) => {
                        if let Err(e) = write_line(output, &line).await {
                            warn!("Failed to write to user output: {e}");
                            break RelayEnd::Disconnected;
                        }
                        received += 1;
                    }
                    Some(Err(e)) => {
                        debug!("Failed to read from server: {e}");
                        break notify_disconnect(output).await;
                    }
                    None => {
                        debug!("Server closed the connection");
                        break notify_disconnect(output).await;
                    }
                }
            }
            _ = token.cancelled() => break RelayEnd::Cancelled,
        }
    };
    token.cancel();
    (end, received)
}

/// Forward every line of `input` to the server.
async fn relay_outbound<Input, Writer>(
    mut input: FramedRead<Input, LinesCodec>,
    mut sink: FramedWrite<Writer, LinesCodec>,
    token: CancellationToken,
) -> (RelayEnd, usize)
where
    Input: AsyncRead + Unpin,
    Writer: AsyncWrite + Unpin,
{
    let mut sent = 0;
    let end = loop {
        tokio::select! {
            line = input.next() => {
                let line = match line {
                    Some(Ok(line)) => line,
                    Some(Err(e)) => {
                        warn!("Failed to read user input: {e}");
                        break RelayEnd::Finished;
                    }
                    None => break RelayEnd::Finished,
                };
                tokio::select! {
                    result = sink.send(line) => {
                        if let Err(e) = result {
                            debug!("Failed to send to server: {e}");
                            break RelayEnd::Disconnected;
                        }
                        sent += 1;
                    }
                    _ = token.cancelled() => break RelayEnd::Cancelled,
                }
            }
            _ = token.cancelled() => break RelayEnd::Cancelled,
        }
    };
    if end == RelayEnd::Finished {
        debug!("User input exhausted, closing the connection");
        if let Err(e) = SinkExt::<String>::close(&mut sink).await {
            debug!("Failed to close server writer: {e}");
        }
    }
    token.cancel();
    (end, sent)
}

async fn notify_disconnect<Output>(output: &mut Output) -> RelayEnd
where
    Output: AsyncWrite + Unpin,
{
    if let Err(e) = write_line(output, SERVER_DISCONNECTED).await {
        warn!("Failed to write disconnect notice: {e}");
    }
    RelayEnd::Disconnected
}

/// Write `line` plus a newline to `output` and flush.
pub(crate) async fn write_line<Output>(output: &mut Output, line: &str) -> io::Result<()>
where
    Output: AsyncWrite + Unpin,
{
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}
