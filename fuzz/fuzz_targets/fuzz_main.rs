// SPDX-License-Identifier: AGPL-3.0-or-later
#![no_main]

use libfuzzer_sys::fuzz_target;
use milkup_core::Markdown;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let md = Markdown::default();
    let first = md.export(&md.parse(text));
    let _ = md.export(&md.parse(&first));
});
