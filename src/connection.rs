use std::io;

use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
};
use futures::StreamExt;
use tokio_util::codec::{
    AnyDelimiterCodec, AnyDelimiterCodecError, FramedRead, FramedWrite, LinesCodec,
    LinesCodecError,
};
use tracing::debug;

use crate::{arguments::ConnectionOptions, Error};

/// Longest line accepted from the server or the user, in bytes.
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// A connection to the chat server, split into a line reader and a line writer.
///
/// The session owns both ends of the transport. Dropping it closes the connection.
#[derive(Debug)]
pub struct Session<Reader, Writer> {
    pub(crate) lines: FramedRead<Reader, AnyDelimiterCodec>,
    pub(crate) sink: FramedWrite<Writer, LinesCodec>,
}

/// A [`Session`] over TCP.
pub type TcpSession = Session<OwnedReadHalf, OwnedWriteHalf>;

impl TcpSession {
    /// Connect to `host:port` as given in `options`.
    pub async fn connect(options: &ConnectionOptions) -> crate::Result<Self> {
        let stream = TcpStream::connect((options.host(), options.port()))
            .await
            .map_err(|source| Error::Connection {
                address: options.address(),
                source,
            })?;
        debug!(peer = ?stream.peer_addr().ok(), "Connected");
        let (reader, writer) = stream.into_split();
        Ok(Session::new(reader, writer))
    }
}

impl<Reader, Writer> Session<Reader, Writer>
where
    Reader: AsyncRead + Unpin,
    Writer: AsyncWrite + Unpin,
{
    /// Wrap an already established transport.
    pub fn new(reader: Reader, writer: Writer) -> Self {
        Self {
            lines: FramedRead::new(reader, server_codec()),
            sink: FramedWrite::new(writer, line_codec()),
        }
    }
}

pub(crate) fn line_codec() -> LinesCodec {
    LinesCodec::new_with_max_length(MAX_LINE_LENGTH)
}

/// Splits server bytes on `\n` only; decoding happens per line in [`read_line`].
fn server_codec() -> AnyDelimiterCodec {
    AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), b"\n".to_vec(), MAX_LINE_LENGTH)
}

/// Next line from the server with `\r\n` or `\n` stripped.
/// Invalid UTF-8 is replaced rather than treated as a failure. Cancel safe.
pub(crate) async fn read_line<Reader>(
    lines: &mut FramedRead<Reader, AnyDelimiterCodec>,
) -> Option<io::Result<String>>
where
    Reader: AsyncRead + Unpin,
{
    let chunk = match lines.next().await? {
        Ok(chunk) => chunk,
        Err(AnyDelimiterCodecError::Io(e)) => return Some(Err(e)),
        Err(AnyDelimiterCodecError::MaxChunkLengthExceeded) => {
            return Some(Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "line too long",
            )))
        }
    };
    let chunk = chunk.strip_suffix(b"\r").unwrap_or(&chunk[..]);
    Some(Ok(String::from_utf8_lossy(chunk).into_owned()))
}

pub(crate) fn into_io_error(error: LinesCodecError) -> io::Error {
    match error {
        LinesCodecError::Io(error) => error,
        LinesCodecError::MaxLineLengthExceeded => {
            io::Error::new(io::ErrorKind::InvalidData, "line too long")
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    use crate::parse_options;

    #[tokio::test]
    async fn connects_to_listening_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port().to_string();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"hi\n").await.unwrap();
        });

        let options = parse_options(["127.0.0.1", port.as_str(), "alice", "secret"]).unwrap();
        let mut session = TcpSession::connect(&options).await.unwrap();
        let mut greeting = [0; 3];
        session.lines.get_mut().read_exact(&mut greeting).await.unwrap();
        assert_eq!(&greeting, b"hi\n");

        server.await.unwrap();
    }

    #[tokio::test]
    async fn refused_connection_is_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port().to_string();
        drop(listener);

        let options = parse_options(["127.0.0.1", port.as_str(), "alice", "secret"]).unwrap();
        match TcpSession::connect(&options).await {
            Err(Error::Connection { address, .. }) => {
                assert_eq!(address, format!("127.0.0.1:{port}"))
            }
            other => panic!("expected connection error, got {other:?}"),
        }
    }
}
