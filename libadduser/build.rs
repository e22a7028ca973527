fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Pass in build-time environment variables, which could be used in
    // crates by `env!` macros.
    println!("cargo:rustc-env=PATH_USERADD=useradd");
    println!("cargo:rustc-env=PATH_USERMOD=usermod");
    println!("cargo:rustc-env=PATH_GROUPADD=groupadd");
    println!("cargo:rustc-env=PATH_GPASSWD=gpasswd");
    println!("cargo:rustc-env=PATH_PASSWD=passwd");
    println!("cargo:rustc-env=PATH_CHPASSWD=chpasswd");
    println!("cargo:rustc-env=PATH_CHAGE=chage");
    // Defaults for the groups and shell of a provisioned user.
    println!("cargo:rustc-env=DEFAULT_GROUP=staff");
    println!("cargo:rustc-env=SUDO_GROUP=sudo");
    println!("cargo:rustc-env=DEFAULT_SHELL=/bin/bash");
}
