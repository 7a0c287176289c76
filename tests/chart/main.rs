mod assembler;
mod ephemeris;
mod houses;
mod support;
