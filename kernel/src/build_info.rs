// Build Metadata and Versioning
//
// Compile-time identity of the console kernel, printed on the boot banner
// and in the first log line. Change the single macro call below to bump
// the version.

macro_rules! define_build_meta {
    ($kernel_name:literal, $version:literal, $build_date:literal) => {
        #[allow(dead_code)]
        pub const KERNEL_NAME: &str = $kernel_name;
        #[allow(dead_code)]
        pub const VERSION: &str = $version;
        #[allow(dead_code)]
        pub const BUILD_DATE: &str = $build_date;

        pub const VERSION_TAG: &str = concat!($kernel_name, " v", $version);
        pub const BOOT_BANNER: &str = concat!(
            $kernel_name,
            " v",
            $version,
            " - polled console (",
            $build_date,
            ")"
        );
    };
}

define_build_meta!("PollTerm", "0.1.0", "2026-10-15");
