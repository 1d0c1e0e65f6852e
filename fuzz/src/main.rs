#[macro_use]
extern crate afl;
extern crate exc14n;

fn main() {
	fuzz!(|data: &[u8]| {
		let canonical = match exc14n::canonicalize_xml(data) {
			Ok(v) => v,
			Err(_) => return,
		};
		// canonical output must be a fixed point, as long as it parses again
		if let Ok(again) = exc14n::canonicalize_xml(&canonical) {
			assert_eq!(canonical, again);
		}
	});
}
