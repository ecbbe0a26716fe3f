use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use http_body_util::BodyExt;
use hyper::{
    body::{Body, Bytes},
    HeaderMap, Method, StatusCode, Uri,
};
use twilight_model::application::interaction::Interaction;

/// Reads the body of a Discord webhook request and returns the interaction it
/// carries once its signature has been verified.
pub async fn try_parse<B: Body>(
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: B,
    public: &VerifyingKey,
) -> Result<Interaction, StatusCode> {
    // Disable all non-`POST` requests
    if *method != Method::POST {
        return Err(StatusCode::METHOD_NOT_ALLOWED);
    }

    // For now, we only allow requests from the root endpoint.
    if uri.path() != "/" {
        return Err(StatusCode::NOT_FOUND);
    }

    // Retrieve security headers
    let maybe_sig = headers.get("X-Signature-Ed25519");
    let maybe_time = headers.get("X-Signature-Timestamp");
    let (sig, timestamp) = maybe_sig.zip(maybe_time).ok_or(StatusCode::UNAUTHORIZED)?;
    let mut signature = [0; Signature::BYTE_SIZE];
    hex::decode_to_slice(sig, &mut signature).map_err(|_| StatusCode::BAD_REQUEST)?;
    let signature = Signature::from_bytes(&signature);

    // Append body after the timestamp
    let payload: Bytes = body.collect().await.map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?.to_bytes();
    let mut message = timestamp.as_bytes().to_vec();
    message.extend_from_slice(&payload);

    // Validate the challenge
    public.verify(&message, &signature).map_err(|_| StatusCode::UNAUTHORIZED)?;
    drop(message);

    // Parse incoming interaction
    serde_json::from_slice(&payload).map_err(|_| StatusCode::BAD_REQUEST)
}
