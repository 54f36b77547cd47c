// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! HTTP client and download helpers. */

use {
    crate::error::Result,
    log::warn,
    std::io::Read,
    url::Url,
};

/// Obtain an HTTP client, taking proxy environment variables into account.
pub fn get_http_client() -> reqwest::Result<reqwest::blocking::Client> {
    let mut builder = reqwest::blocking::ClientBuilder::new();

    for (key, value) in std::env::vars() {
        let key = key.to_lowercase();
        if key.ends_with("_proxy") {
            let end = key.len() - "_proxy".len();
            let schema = &key[..end];

            if let Ok(url) = Url::parse(&value) {
                if let Some(proxy) = match schema {
                    "http" => Some(reqwest::Proxy::http(url.as_str())),
                    "https" => Some(reqwest::Proxy::https(url.as_str())),
                    _ => None,
                } {
                    if let Ok(proxy) = proxy {
                        builder = builder.proxy(proxy);
                    }
                }
            }
        }
    }

    builder.build()
}

/// Fetch a URL and return its body.
pub fn download(client: &reqwest::blocking::Client, url: &str) -> Result<Vec<u8>> {
    warn!("downloading {}", url);
    let url = Url::parse(url)?;
    let mut response = client.get(url).send()?.error_for_status()?;

    let mut data: Vec<u8> = Vec::new();
    response.read_to_end(&mut data)?;

    Ok(data)
}
