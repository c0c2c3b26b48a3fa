pub mod decoder;
pub mod mfcc;
