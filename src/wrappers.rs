/*
* Copyright (C) 2019-2023 EverX. All Rights Reserved.
*
* Licensed under the SOFTWARE EVALUATION License (the "License"); you may not use
* this file except in compliance with the License.
*
* Unless required by applicable law or agreed to in writing, software
* distributed under the License is distributed on an "AS IS" BASIS,
* WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
* See the License for the specific EVERX DEV software governing permissions and
* limitations under the License.
*/

use crate::{read_single_root_boc, write_boc, Cell, Result};
use sha2::Digest;

pub fn sha256_digest(data: impl AsRef<[u8]>) -> [u8; 32] {
    sha2::Sha256::digest(data).into()
}

pub fn base64_decode(input: impl AsRef<[u8]>) -> Result<Vec<u8>> {
    Ok(base64::decode(input)?)
}

pub fn base64_encode(input: impl AsRef<[u8]>) -> String {
    base64::encode(input)
}

pub fn base64_encode_url_safe(input: impl AsRef<[u8]>) -> String {
    base64::encode_config(input, base64::URL_SAFE)
}

/// Upper case hex of single root bag of cells
pub fn boc_to_hex(cell: &Cell) -> Result<String> {
    Ok(hex::encode_upper(write_boc(cell)?))
}

pub fn boc_from_hex(input: &str) -> Result<Cell> {
    read_single_root_boc(hex::decode(input.trim())?)
}

pub fn boc_to_base64(cell: &Cell) -> Result<String> {
    Ok(base64_encode(write_boc(cell)?))
}

pub fn boc_to_base64_url(cell: &Cell) -> Result<String> {
    Ok(base64_encode_url_safe(write_boc(cell)?))
}

/// Accepts both standard and url safe alphabets
pub fn boc_from_base64(input: &str) -> Result<Cell> {
    let input = input.trim();
    let data = match base64::decode(input) {
        Ok(data) => data,
        Err(_) => base64::decode_config(input, base64::URL_SAFE)?
    };
    read_single_root_boc(data)
}

#[cfg(test)]
#[path = "tests/test_wrappers.rs"]
mod tests;
