#![forbid(unsafe_code)]

// ***************************************************************************
//                                Constants
// ***************************************************************************
pub const PROP_ARMSTRONG : &str = "armstrong";
pub const PROP_EVEN      : &str = "even";
pub const PROP_ODD       : &str = "odd";

// ***************************************************************************
//                             Public Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// is_prime:
// ---------------------------------------------------------------------------
/** Trial division by every x in [2, floor(sqrt(n))].  Numbers less than or
 * equal to 1 are never prime.
 */
pub fn is_prime(n: i64) -> bool {
    if n <= 1 {
        return false;
    }

    // x <= n / x is x * x <= n without the overflow.
    let n = n as u64;
    let mut x: u64 = 2;
    while x <= n / x {
        if n % x == 0 {
            return false;
        }
        x += 1;
    }
    true
}

// ---------------------------------------------------------------------------
// is_perfect:
// ---------------------------------------------------------------------------
/** A number is perfect when the sum of its proper divisors equals itself.
 * Divisors are collected in pairs (x, n/x) up to the square root, starting
 * from 1 which divides everything.
 */
pub fn is_perfect(n: i64) -> bool {
    if n <= 1 {
        return false;
    }

    let n = n as u64;
    let mut sum: u128 = 1;
    let mut x: u64 = 2;
    while x <= n / x {
        if n % x == 0 {
            sum += x as u128;
            let complement = n / x;
            if complement != x {
                sum += complement as u128;
            }
        }
        x += 1;
    }
    sum == n as u128
}

// ---------------------------------------------------------------------------
// is_armstrong:
// ---------------------------------------------------------------------------
/** Sum each decimal digit raised to the digit count and compare with the
 * number.  Both sides use the absolute value, so -153 is an Armstrong number.
 */
pub fn is_armstrong(n: i64) -> bool {
    let value = n.unsigned_abs();
    let digits = decimal_digits(value);
    let power = digits.len() as u32;

    // 19 digits of 9^19 stays well inside u128.
    let sum: u128 = digits.iter().map(|d| (*d as u128).pow(power)).sum();
    sum == value as u128
}

// ---------------------------------------------------------------------------
// digit_sum:
// ---------------------------------------------------------------------------
/** Sum of the decimal digits.  The sign of negative numbers is ignored. */
pub fn digit_sum(n: i64) -> u64 {
    decimal_digits(n.unsigned_abs()).iter().map(|d| *d as u64).sum()
}

// ---------------------------------------------------------------------------
// is_even:
// ---------------------------------------------------------------------------
pub fn is_even(n: i64) -> bool {
    n % 2 == 0
}

// ---------------------------------------------------------------------------
// properties:
// ---------------------------------------------------------------------------
/** Ordered property tags: "armstrong" when it applies, then exactly one of
 * "even" or "odd".
 */
pub fn properties(n: i64) -> Vec<String> {
    let mut props = Vec::with_capacity(2);
    if is_armstrong(n) {
        props.push(PROP_ARMSTRONG.to_string());
    }
    let parity = if is_even(n) {PROP_EVEN} else {PROP_ODD};
    props.push(parity.to_string());
    props
}

// ***************************************************************************
//                             Private Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// decimal_digits:
// ---------------------------------------------------------------------------
/** Most significant digit first.  Zero has the single digit 0. */
fn decimal_digits(value: u64) -> Vec<u8> {
    value.to_string().bytes().map(|b| b - b'0').collect()
}
