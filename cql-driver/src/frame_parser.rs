use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error;
use crate::frame::message_request::RequestBody;
use crate::frame::{read_frame, read_request_frame, FrameHeader, Response, Version};

/// Reads a single complete frame, header included, without decoding its body.
pub async fn read_raw_frame<T: AsyncRead + Unpin>(reader: &mut T) -> error::Result<Vec<u8>> {
    let mut version_bytes = [0; Version::BYTE_LENGTH];
    reader.read_exact(&mut version_bytes).await?;

    // NOTE: header length depends on the version, so it can be known only now
    let header_len = Version::try_from(version_bytes[0])?.header_len();

    let mut frame = vec![0; header_len];
    frame[0] = version_bytes[0];
    reader.read_exact(&mut frame[Version::BYTE_LENGTH..]).await?;

    let header = FrameHeader::parse(&frame)?;

    frame.resize(header_len + header.body_len, 0);
    reader.read_exact(&mut frame[header_len..]).await?;

    Ok(frame)
}

/// Reads and decodes a response frame.
pub async fn read_response<T: AsyncRead + Unpin>(reader: &mut T) -> error::Result<Response> {
    read_frame(&read_raw_frame(reader).await?)
}

/// Reads and decodes a request frame, as a server would.
pub async fn read_request<T: AsyncRead + Unpin>(
    reader: &mut T,
) -> error::Result<(FrameHeader, RequestBody)> {
    read_request_frame(&read_raw_frame(reader).await?)
}
