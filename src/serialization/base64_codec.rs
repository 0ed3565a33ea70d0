//! Base64 text form of the V2 + DEFLATE encoding, as embedded in interval log lines.

use super::{DeserializeError, Deserializer, Serializer, V2DeflateSerializeError, V2DeflateSerializer};
use crate::storage::CountsStorage;
use crate::Histogram;

/// Serialize `h` as V2 + DEFLATE and encode the bytes as standard base64.
///
/// ```
/// use hdrpack::DenseHistogram;
/// use hdrpack::serialization::{decode_base64, encode_base64};
///
/// let mut h = DenseHistogram::<u64>::new(3).unwrap();
/// h.record(1_234).unwrap();
///
/// let text = encode_base64(&h).unwrap();
/// let back: DenseHistogram<u64> = decode_base64(&text).unwrap();
/// assert_eq!(h, back);
/// ```
pub fn encode_base64<S: CountsStorage>(h: &Histogram<S>) -> Result<String, V2DeflateSerializeError> {
    let mut bytes = Vec::new();
    V2DeflateSerializer::new().serialize(h, &mut bytes)?;
    Ok(base64::encode(&bytes))
}

/// Decode base64 text produced by `encode_base64` (or by any other HdrHistogram implementation's
/// interval log writer). Surrounding whitespace is ignored.
pub fn decode_base64<S: CountsStorage>(text: &str) -> Result<Histogram<S>, DeserializeError> {
    let bytes = base64::decode(text.trim()).map_err(|_| DeserializeError::InvalidBase64)?;
    Deserializer::new().deserialize(&mut bytes.as_slice())
}
