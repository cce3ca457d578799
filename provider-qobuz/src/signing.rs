//! Request signing for protected endpoints
//!
//! Signature = md5 hex of: endpoint with `/` removed, every `key+value` pair in
//! key order, the request timestamp, the application secret. The format must
//! match the remote bit for bit.

use crate::types::Params;

/// Compute the request signature.
///
/// Parameters may be given in any order; they are sorted by key first.
pub fn sign<'a, I>(endpoint: &str, params: I, timestamp: &str, secret: &str) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut pairs: Vec<(&str, &str)> = params.into_iter().collect();
    pairs.sort_unstable();

    let mut data: String = endpoint.split('/').collect();
    for (key, value) in pairs {
        data.push_str(key);
        data.push_str(value);
    }
    data.push_str(timestamp);
    data.push_str(secret);

    format!("{:x}", md5::compute(data.as_bytes()))
}

/// Return `params` extended with `request_ts`, `request_sig`, `app_id` and
/// `user_auth_token`. The signature covers the caller's parameters only.
pub fn signed_params(
    endpoint: &str,
    params: &Params,
    timestamp: i64,
    app_id: &str,
    app_secret: &str,
    user_auth_token: &str,
) -> Params {
    let request_ts = timestamp.to_string();
    let request_sig = sign(
        endpoint,
        params.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        &request_ts,
        app_secret,
    );

    let mut signed = params.clone();
    signed.insert("request_ts".to_string(), request_ts);
    signed.insert("request_sig".to_string(), request_sig);
    signed.insert("app_id".to_string(), app_id.to_string());
    signed.insert("user_auth_token".to_string(), user_auth_token.to_string());
    signed
}
