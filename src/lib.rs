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

pub mod types;
pub use self::types::*;

pub mod cell;
pub use self::cell::*;

pub mod dictionary;
pub use self::dictionary::*;

pub mod boc;
pub use boc::*;

pub mod wrappers;
pub use wrappers::*;

/// Parses fift-like bitstring digits (hex or binary) with optional `_` completion tag.
/// Returns bytes closed by the completion tag
pub fn parse_slice_base(slice: &str, mut bits: usize, base: u32) -> Option<Vec<u8>> {
    debug_assert!(bits < 8, "it is offset to get slice parsed");
    let mut acc = 0u8;
    let mut data = vec![];
    let mut completion_tag = false;
    let step = match base {
        2 => 1,
        16 => 4,
        _ => return None
    };
    for ch in slice.chars() {
        if completion_tag {
            return None
        }
        match ch.to_digit(base) {
            Some(x) => {
                for i in (0..step).rev() {
                    if (x >> i) & 1 != 0 {
                        acc |= 0x80 >> bits;
                    }
                    bits += 1;
                    if bits == 8 {
                        data.push(acc);
                        acc = 0;
                        bits = 0;
                    }
                }
            }
            None => match ch {
                '_' => completion_tag = true,
                _ => return None
            }
        }
    }
    if completion_tag {
        // the tag is already inside the digits: drop zero tail and keep the last one bit
        if bits != 0 {
            data.push(acc);
        }
        while let Some(last) = data.last() {
            if *last == 0 {
                data.pop();
            } else {
                break
            }
        }
        if data.is_empty() {
            return None
        }
    } else if bits != 0 {
        acc |= 0x80 >> bits;
        data.push(acc);
    } else {
        data.push(0x80);
    }
    Some(data)
}
