use futures::SinkExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use crate::{
    arguments::ConnectionOptions,
    connection::{into_io_error, read_line, Session},
    stream::write_line,
    Error, Result,
};

/// Response prefix by which the server signals accepted credentials.
pub const WELCOME_PREFIX: &str = "Welcome";

impl<Reader, Writer> Session<Reader, Writer>
where
    Reader: AsyncRead + Unpin,
    Writer: AsyncWrite + Unpin,
{
    /// Log in with the credentials from `options`.
    ///
    /// Forwards the server's prompt (if there is one) and its welcome line to `output`.
    /// Every write to `output` is flushed before this returns.
    ///
    /// # Errors
    /// [`Error::Rejected`] with the server's response if it does not start with `"Welcome"`,
    /// [`Error::ServerClosed`] if the server hangs up before responding,
    /// [`Error::Handshake`] on any other I/O failure.
    pub async fn authenticate<Output>(
        &mut self,
        options: &ConnectionOptions,
        output: &mut Output,
    ) -> Result<()>
    where
        Output: AsyncWrite + Unpin,
    {
        match read_line(&mut self.lines).await {
            Some(Ok(prompt)) if !prompt.is_empty() => {
                write_line(output, &prompt).await.map_err(Error::Handshake)?;
            }
            Some(Ok(_)) | None => debug!("Server sent no prompt"),
            Some(Err(e)) => return Err(Error::Handshake(e)),
        }

        self.sink
            .send(format!("{} {}", options.username(), options.password()))
            .await
            .map_err(|e| Error::Handshake(into_io_error(e)))?;
        debug!(username = options.username(), "Sent credentials");

        let response = read_line(&mut self.lines)
            .await
            .ok_or(Error::ServerClosed)?
            .map_err(Error::Handshake)?;

        if !response.starts_with(WELCOME_PREFIX) {
            return Err(Error::Rejected(response));
        }
        write_line(output, &response).await.map_err(Error::Handshake)?;
        info!(username = options.username(), "Authenticated");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parse_options;
    use tokio_test::io::Builder as Mock;

    fn alice() -> ConnectionOptions {
        parse_options(["localhost", "12345", "alice", "secret"]).unwrap()
    }

    #[tokio::test]
    async fn forwards_prompt_and_welcome() {
        let reader = Mock::new()
            .read(b"Please enter your username and password, separated by a space\n")
            .read(b"Welcome back!\n")
            .build();
        let writer = Mock::new().write(b"alice secret\n").build();
        let mut session = Session::new(reader, writer);
        let mut output = Vec::new();

        session.authenticate(&alice(), &mut output).await.unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Please enter your username and password, separated by a space\nWelcome back!\n"
        );
    }

    #[tokio::test]
    async fn rejection_carries_server_text() {
        let reader = Mock::new()
            .read(b"Please enter...\n")
            .read(b"Invalid credentials\n")
            .build();
        let writer = Mock::new().write(b"alice secret\n").build();
        let mut session = Session::new(reader, writer);
        let mut output = Vec::new();

        let result = session.authenticate(&alice(), &mut output).await;

        match result {
            Err(Error::Rejected(text)) => assert_eq!(text, "Invalid credentials"),
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(output, b"Please enter...\n");
    }

    #[tokio::test]
    async fn welcome_prefix_is_case_sensitive() {
        let reader = Mock::new().read(b"welcome\n").read(b"welcome alice\n").build();
        let writer = Mock::new().write(b"alice secret\n").build();
        let mut session = Session::new(reader, writer);

        let result = session.authenticate(&alice(), &mut Vec::new()).await;
        assert!(matches!(result, Err(Error::Rejected(text)) if text == "welcome alice"));
    }

    #[tokio::test]
    async fn blank_prompt_is_not_forwarded() {
        let reader = Mock::new().read(b"\r\n").read(b"Welcome\r\n").build();
        let writer = Mock::new().write(b"alice secret\n").build();
        let mut session = Session::new(reader, writer);
        let mut output = Vec::new();

        session.authenticate(&alice(), &mut output).await.unwrap();
        assert_eq!(output, b"Welcome\n");
    }

    #[tokio::test]
    async fn hang_up_before_response_is_not_a_rejection() {
        let reader = Mock::new().read(b"Please enter...\n").build();
        let writer = Mock::new().write(b"alice secret\n").build();
        let mut session = Session::new(reader, writer);
        let mut output = Vec::new();

        let result = session.authenticate(&alice(), &mut output).await;
        assert!(matches!(result, Err(Error::ServerClosed)));
        assert_eq!(output, b"Please enter...\n");
    }

    #[tokio::test]
    async fn closed_stream_without_prompt_does_not_crash() {
        let reader = Mock::new().build();
        let writer = Mock::new().write(b"alice secret\n").build();
        let mut session = Session::new(reader, writer);
        let mut output = Vec::new();

        let result = session.authenticate(&alice(), &mut output).await;
        assert!(matches!(result, Err(Error::ServerClosed)));
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn write_failure_is_handshake_error() {
        let reader = Mock::new().read(b"Please enter...\n").build();
        let writer = Mock::new()
            .write_error(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "gone",
            ))
            .build();
        let mut session = Session::new(reader, writer);

        let result = session.authenticate(&alice(), &mut Vec::new()).await;
        assert!(matches!(result, Err(Error::Handshake(e)) if e.kind() == std::io::ErrorKind::BrokenPipe));
    }
}
